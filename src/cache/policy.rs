//! Eviction Policy Module
//!
//! Pure decisions about which rows are expired and which exceed capacity.
//! Nothing here touches storage; the engine turns these into backend calls.

use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::storage::Predicate;

// == Eviction Policy ==
/// TTL expiry plus a capacity bound ranked by write recency.
///
/// Both sweeps run after every write; there is no background timer, so a
/// cache that receives no writes may keep expired rows on disk. Reads never
/// return them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    ttl_ms: i64,
    max_entries: usize,
}

impl EvictionPolicy {
    // == Constructor ==
    /// Creates a policy, rejecting a zero TTL or zero capacity.
    pub fn new(ttl: Duration, max_entries: usize) -> Result<Self> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        if ttl_ms == 0 {
            return Err(CacheError::Configuration(
                "ttl must be at least 1 millisecond".to_string(),
            ));
        }
        if max_entries == 0 {
            return Err(CacheError::Configuration(
                "max must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            ttl_ms,
            max_entries,
        })
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Expiration timestamp for a row written at `created_at`.
    pub fn expires_at(&self, created_at: i64) -> i64 {
        created_at.saturating_add(self.ttl_ms)
    }

    /// Expiry predicate: a row is expired once `now` reaches `expires_at`.
    pub fn is_expired(&self, expires_at: i64, now: i64) -> bool {
        expires_at <= now
    }

    /// Rows to drop from storage because they have expired.
    pub fn expired(&self, now: i64) -> Predicate {
        Predicate::Expired { now }
    }

    /// Rows visible to reads.
    pub fn live(&self, now: i64) -> Predicate {
        Predicate::Live { now }
    }

    /// Rows ranked past `max_entries` by recency, expired or not.
    pub fn over_capacity(&self) -> Predicate {
        Predicate::BeyondCapacity {
            max: self.max_entries,
        }
    }
}
