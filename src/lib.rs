//! Agecache - a fixed-capacity LRU cache with age-stamped recency
//!
//! Tracks recency through monotonically increasing integer age stamps and
//! two coupled indices (key to record, age to record) instead of a linked
//! list. Eviction walks a lazily advanced lower bound forward through the
//! sparse age space, which amortizes to O(1) per operation.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{AgeLruCache, CacheStats};
pub use config::Config;
pub use error::{CacheError, Result};
