//! SQLite Backend Module
//!
//! Stores rows in a single `cache` table through rusqlite.
//!
//! `upsert` uses `INSERT OR REPLACE`, which deletes and re-inserts the row,
//! so a rewritten key always gets a fresh rowid. Scans order by
//! `created_at DESC, rowid DESC`, making rowid the tie-break for rows written
//! in the same millisecond.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::config::StorePath;
use crate::error::{CacheError, Result};
use crate::storage::{Predicate, StorageBackend, StoredRow};

const CREATE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS cache (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        expires INTEGER NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_cache_expires ON cache(expires);
    CREATE INDEX IF NOT EXISTS idx_cache_created_at ON cache(created_at);
";

const ORDER_NEWEST_FIRST: &str = "ORDER BY created_at DESC, rowid DESC";

// == SQLite Backend ==
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Opens (or creates) the store at `path` and ensures the table exists.
    ///
    /// Any failure here is reported as a configuration error: a cache whose
    /// storage cannot be opened is never constructed.
    pub fn open(path: &StorePath) -> Result<Self> {
        let conn = match path {
            StorePath::Memory => Connection::open_in_memory(),
            StorePath::File(file) => Connection::open(file),
        }
        .map_err(|e| CacheError::Configuration(format!("Failed to open {path}: {e}")))?;

        conn.execute_batch(CREATE_SCHEMA)
            .map_err(|e| CacheError::Configuration(format!("Failed to create schema: {e}")))?;

        debug!(path = %path, "SQLite store ready");
        Ok(Self { conn })
    }
}

/// Renders a predicate as a SQL `WHERE` body plus its bound parameters.
fn where_clause(predicate: Predicate) -> (&'static str, Vec<i64>) {
    match predicate {
        Predicate::All => ("1 = 1", Vec::new()),
        Predicate::Expired { now } => ("expires <= ?1", vec![now]),
        Predicate::Live { now } => ("expires > ?1", vec![now]),
        Predicate::BeyondCapacity { max } => (
            "key NOT IN (SELECT key FROM cache ORDER BY created_at DESC, rowid DESC LIMIT ?1)",
            vec![i64::try_from(max).unwrap_or(i64::MAX)],
        ),
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        key: row.get(0)?,
        value: row.get(1)?,
        expires_at: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl StorageBackend for SqliteBackend {
    fn upsert(&mut self, row: &StoredRow) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cache (key, value, expires, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![row.key, row.value, row.expires_at, row.created_at],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<StoredRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT key, value, expires, created_at FROM cache WHERE key = ?1",
                params![key],
                read_row,
            )
            .optional()?;
        Ok(row)
    }

    fn delete(&mut self, key: &str) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM cache WHERE key = ?1", params![key])?)
    }

    fn delete_where(&mut self, predicate: Predicate) -> Result<usize> {
        let (clause, args) = where_clause(predicate);
        let sql = format!("DELETE FROM cache WHERE {clause}");
        Ok(self.conn.execute(&sql, params_from_iter(args))?)
    }

    fn count_where(&self, predicate: Predicate) -> Result<usize> {
        let (clause, args) = where_clause(predicate);
        let sql = format!("SELECT COUNT(*) FROM cache WHERE {clause}");
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(args), |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn scan(&self, predicate: Predicate) -> Result<Vec<StoredRow>> {
        let (clause, args) = where_clause(predicate);
        let sql = format!(
            "SELECT key, value, expires, created_at FROM cache WHERE {clause} {ORDER_NEWEST_FIRST}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| CacheError::Storage(e))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SqliteBackend {
        SqliteBackend::open(&StorePath::Memory).unwrap()
    }

    fn row(key: &str, created_at: i64, expires_at: i64) -> StoredRow {
        StoredRow {
            key: key.to_string(),
            value: format!("{{\"k\":\"{key}\"}}"),
            expires_at,
            created_at,
        }
    }

    fn keys(rows: Vec<StoredRow>) -> Vec<String> {
        rows.into_iter().map(|r| r.key).collect()
    }

    #[test]
    fn test_upsert_and_get() {
        let mut backend = backend();
        backend.upsert(&row("a", 1, 100)).unwrap();

        assert_eq!(backend.get("a").unwrap(), Some(row("a", 1, 100)));
        assert!(backend.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_and_refreshes_order() {
        let mut backend = backend();
        backend.upsert(&row("a", 10, 100)).unwrap();
        backend.upsert(&row("b", 10, 100)).unwrap();
        // Same millisecond rewrite of "a" must make it the newest row
        backend.upsert(&row("a", 10, 200)).unwrap();

        assert_eq!(backend.count_where(Predicate::All).unwrap(), 2);
        assert_eq!(keys(backend.scan(Predicate::All).unwrap()), vec!["a", "b"]);
        assert_eq!(backend.get("a").unwrap().unwrap().expires_at, 200);
    }

    #[test]
    fn test_scan_orders_by_created_desc() {
        let mut backend = backend();
        backend.upsert(&row("old", 1, 100)).unwrap();
        backend.upsert(&row("new", 3, 100)).unwrap();
        backend.upsert(&row("mid", 2, 100)).unwrap();

        assert_eq!(
            keys(backend.scan(Predicate::All).unwrap()),
            vec!["new", "mid", "old"]
        );
    }

    #[test]
    fn test_delete() {
        let mut backend = backend();
        backend.upsert(&row("a", 1, 100)).unwrap();

        assert_eq!(backend.delete("a").unwrap(), 1);
        assert_eq!(backend.delete("a").unwrap(), 0);
    }

    #[test]
    fn test_expired_and_live_predicates() {
        let mut backend = backend();
        backend.upsert(&row("gone", 1, 50)).unwrap();
        backend.upsert(&row("edge", 2, 60)).unwrap();
        backend.upsert(&row("live", 3, 61)).unwrap();

        assert_eq!(backend.count_where(Predicate::Live { now: 60 }).unwrap(), 1);
        assert_eq!(
            keys(backend.scan(Predicate::Live { now: 60 }).unwrap()),
            vec!["live"]
        );
        assert_eq!(backend.delete_where(Predicate::Expired { now: 60 }).unwrap(), 2);
        assert_eq!(backend.count_where(Predicate::All).unwrap(), 1);
    }

    #[test]
    fn test_beyond_capacity_keeps_newest() {
        let mut backend = backend();
        for key in ["user1", "user2", "user3"] {
            // Identical timestamps: insertion order decides
            backend.upsert(&row(key, 42, 1_000)).unwrap();
        }

        assert_eq!(
            backend.delete_where(Predicate::BeyondCapacity { max: 2 }).unwrap(),
            1
        );
        assert_eq!(
            keys(backend.scan(Predicate::All).unwrap()),
            vec!["user3", "user2"]
        );
    }

    #[test]
    fn test_transaction_rollback() {
        let mut backend = backend();
        backend.upsert(&row("kept", 1, 100)).unwrap();

        backend.begin().unwrap();
        backend.upsert(&row("discarded", 2, 100)).unwrap();
        backend.rollback().unwrap();

        assert!(backend.get("discarded").unwrap().is_none());

        backend.begin().unwrap();
        backend.upsert(&row("committed", 3, 100)).unwrap();
        backend.commit().unwrap();

        assert!(backend.get("committed").unwrap().is_some());
    }

    #[test]
    fn test_open_unopenable_path() {
        let path = StorePath::File("/nonexistent-dir/really/not/here/cache.db".into());
        assert!(matches!(
            SqliteBackend::open(&path),
            Err(CacheError::Configuration(_))
        ));
    }

    #[test]
    fn test_close() {
        let backend = backend();
        assert!(backend.close().is_ok());
    }
}
