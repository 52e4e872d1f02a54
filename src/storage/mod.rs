//! Storage Module
//!
//! The storage capability the cache engine is written against, plus the
//! SQLite and in-memory implementations.
//!
//! Backends hold rows and answer predicates. They know nothing about TTLs or
//! capacity limits; the engine decides which predicate to run and when.

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::error::Result;

/// Name of the single table every backend exposes.
pub const TABLE_NAME: &str = "cache";

// == Stored Row ==
/// One row of the `cache` table, value still in its encoded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub key: String,
    /// Canonical encoded document
    pub value: String,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: i64,
    /// Write timestamp (Unix milliseconds), the recency key
    pub created_at: i64,
}

// == Predicate ==
/// Row filters understood by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Every row
    All,
    /// Rows with `expires <= now`
    Expired { now: i64 },
    /// Rows with `expires > now`
    Live { now: i64 },
    /// Rows ranked past `max` when ordered newest first
    BeyondCapacity { max: usize },
}

impl Predicate {
    /// Evaluates a row-local predicate. `BeyondCapacity` depends on the rest
    /// of the table and always returns false here.
    pub fn matches(&self, row: &StoredRow) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Expired { now } => row.expires_at <= *now,
            Predicate::Live { now } => row.expires_at > *now,
            Predicate::BeyondCapacity { .. } => false,
        }
    }
}

// == Storage Backend ==
/// Durable, indexed key/value rows with predicate queries.
///
/// Every call is synchronous and visible to the next call as soon as it
/// returns. Scans are ordered by `created_at` descending; rows written in
/// the same millisecond come back most recent write first.
pub trait StorageBackend {
    /// Inserts the row or fully replaces the row with the same key.
    fn upsert(&mut self, row: &StoredRow) -> Result<()>;

    /// Point lookup without any expiry filtering.
    fn get(&self, key: &str) -> Result<Option<StoredRow>>;

    /// Removes the row for `key`, returning the number of rows removed.
    fn delete(&mut self, key: &str) -> Result<usize>;

    /// Removes every row matching `predicate`.
    fn delete_where(&mut self, predicate: Predicate) -> Result<usize>;

    fn count_where(&self, predicate: Predicate) -> Result<usize>;

    /// Materializes every row matching `predicate`, newest first.
    fn scan(&self, predicate: Predicate) -> Result<Vec<StoredRow>>;

    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    /// Releases the underlying handle.
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}
