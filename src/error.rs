//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::cache::Key;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent from the cache.
    ///
    /// A normal lookup outcome rather than a failure; callers branch on it
    /// the way they would on an empty option.
    #[error("key not found: {0}")]
    NotFound(Key),

    /// Constructor precondition violated
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
