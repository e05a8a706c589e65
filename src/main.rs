//! Agecache demo driver
//!
//! Sequences get/put calls against the cache from a scripted workload and
//! reports outcomes, acting as an external caller of the library.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agecache::{AgeLruCache, CacheError, Config};

fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agecache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting agecache demo");

    let config = Config::from_env();
    info!("Configuration loaded: capacity={}", config.capacity);

    let mut cache = AgeLruCache::new(config.capacity).context("failed to create cache")?;

    run_workload(&mut cache);

    let stats = cache.stats();
    info!(
        "Workload complete: {} resident, hit rate {:.2}",
        stats.resident,
        stats.hit_rate()
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}

/// Drives the cache through a scripted workload: fills to twice capacity so
/// the older half is evicted, then demonstrates misses, hits, and
/// replacement.
fn run_workload(cache: &mut AgeLruCache) {
    let span = cache.capacity() as i64 * 2;

    for key in 0..span {
        cache.put(key, key * 10);
    }

    // The first half was evicted, the second half survives.
    match cache.get(0) {
        Ok(value) => info!(key = 0, value, "unexpected hit"),
        Err(CacheError::NotFound(key)) => info!(key, "oldest key was evicted"),
        Err(error) => info!(%error, "lookup failed"),
    }
    if let Ok(value) = cache.get(span - 1) {
        info!(key = span - 1, value, "newest key is resident");
    }

    // Replacing a resident key refreshes its value without evicting anyone.
    cache.put(span - 1, -1);
    if let Ok(value) = cache.get(span - 1) {
        info!(key = span - 1, value, "replaced key re-read");
    }
}
