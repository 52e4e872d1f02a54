//! Cache Entry Module
//!
//! Decoded view of a stored row plus the engine's clock.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::schema::ValueCodec;
use crate::storage::StoredRow;

// == Cache Entry ==
/// A single live entry with its decoded document and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub key: String,
    /// The stored document
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: i64,
    /// Write timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl CacheEntry {
    // == From Row ==
    /// Decodes a stored row with the cache's codec.
    pub fn from_row(row: StoredRow, codec: &dyn ValueCodec) -> Result<Self> {
        let value = codec.decode(&row.value)?;
        Ok(Self {
            key: row.key,
            value,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds at `now`, or 0 once expired.
    pub fn ttl_remaining_ms(&self, now: i64) -> u64 {
        u64::try_from(self.expires_at - now).unwrap_or(0)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::JsonCodec;
    use serde_json::json;

    fn entry(expires_at: i64) -> CacheEntry {
        CacheEntry {
            key: "k".to_string(),
            value: json!({ "v": 1 }),
            expires_at,
            created_at: 0,
        }
    }

    #[test]
    fn test_from_row_decodes_value() {
        let codec = JsonCodec::compile(&json!({ "type": "object" })).unwrap();
        let row = StoredRow {
            key: "user1".to_string(),
            value: r#"{"name":"ada"}"#.to_string(),
            expires_at: 200,
            created_at: 100,
        };

        let entry = CacheEntry::from_row(row, &codec).unwrap();
        assert_eq!(entry.key, "user1");
        assert_eq!(entry.value, json!({ "name": "ada" }));
        assert_eq!(entry.expires_at, 200);
        assert_eq!(entry.created_at, 100);
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let entry = entry(1_000);
        assert_eq!(entry.ttl_remaining_ms(400), 600);
        assert_eq!(entry.ttl_remaining_ms(1_000), 0);
        assert_eq!(entry.ttl_remaining_ms(5_000), 0);
    }

    #[test]
    fn test_current_timestamp_is_monotonic_enough() {
        let a = current_timestamp_ms();
        let b = current_timestamp_ms();
        assert!(b >= a);
        assert!(a > 1_600_000_000_000);
    }
}
