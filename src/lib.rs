//! SQLite Cache - A persistent key/value cache on an embedded database
//!
//! Entries expire after a fixed TTL, the store is trimmed to a maximum entry
//! count by write recency, and every value is checked against a shape
//! descriptor before it is written.

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod schema;
pub mod storage;

pub use cache::{Cache, CacheEntry, CacheStats, EvictionPolicy};
pub use config::{CacheConfig, LoggingConfig, StorePath};
pub use error::{CacheError, Result};
