//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// A miss and any operation on a closed cache are not errors: they show up as
/// `Ok(None)`, `Ok(false)` or empty results instead.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Construction-time failure: bad path, bad shape descriptor, bad limits,
    /// or a storage location that cannot be opened.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Per-call input rejection (empty key, non-object value, shape mismatch)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failure reported by the SQLite backend
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A stored document could not be encoded or decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CacheError {
    /// Returns true for errors caused by caller input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, CacheError::Validation(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
