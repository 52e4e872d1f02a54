//! Cache Module
//!
//! The cache engine with TTL expiry, recency-ranked capacity eviction and
//! snapshot enumeration.

mod entry;
mod iter;
mod policy;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use iter::{Entries, Keys, Values};
pub use policy::EvictionPolicy;
pub use stats::CacheStats;
pub use store::Cache;
