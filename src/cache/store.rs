//! Cache Store Module
//!
//! The cache engine: validates and encodes documents, persists them through a
//! [`StorageBackend`], and applies the [`EvictionPolicy`] on every write.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::cache::{
    current_timestamp_ms, CacheEntry, CacheStats, Entries, EvictionPolicy, Keys, Values,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::schema::{JsonCodec, ValueCodec};
use crate::storage::{Predicate, SqliteBackend, StorageBackend, StoredRow};

// == Cache ==
/// Persistent key/value cache with TTL expiry and a recency-ranked capacity
/// bound.
///
/// # Write sequence
/// `set` runs three independent storage statements: upsert, expiry sweep,
/// capacity trim. Without [`CacheConfig::atomic_writes`] nothing encloses
/// them, so another writer on the same store file can observe capacity
/// briefly exceeded or an expired row still present. Mutating calls take
/// `&mut self`; sharing one cache across threads needs external locking.
///
/// # Closed caches
/// After [`Cache::close`] every operation is a silent no-op: `set` returns
/// `Ok(self)`, lookups miss, `size` is 0 and enumerations are empty. This lets
/// shutdown ordering in calling code stay sloppy without turning into errors.
#[derive(Debug)]
pub struct Cache<B: StorageBackend = SqliteBackend> {
    /// Storage handle, `None` once closed
    backend: Option<B>,
    codec: Box<dyn ValueCodec>,
    policy: EvictionPolicy,
    atomic_writes: bool,
    /// Name attached to log events
    label: String,
    stats: CacheStats,
}

impl Cache<SqliteBackend> {
    // == Open ==
    /// Builds a SQLite-backed cache from `config`.
    ///
    /// Fails with [`CacheError::Configuration`] for bad limits, an invalid
    /// shape descriptor or a store that cannot be opened; no cache is
    /// returned in that case.
    pub fn open(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let policy = EvictionPolicy::new(config.ttl, config.max_entries)?;
        let codec = JsonCodec::compile(&config.shape)?;
        let backend = SqliteBackend::open(&config.path)?;

        info!(
            cache = %config.logging.label,
            path = %config.path,
            ttl_ms = policy.ttl_ms(),
            max = policy.max_entries(),
            "Cache opened"
        );

        Ok(Self::with_backend(backend, Box::new(codec), policy)
            .with_atomic_writes(config.atomic_writes)
            .with_label(config.logging.label))
    }
}

impl<B: StorageBackend> Cache<B> {
    // == Constructor ==
    /// Creates a cache over any backend and codec.
    pub fn with_backend(backend: B, codec: Box<dyn ValueCodec>, policy: EvictionPolicy) -> Self {
        Self {
            backend: Some(backend),
            codec,
            policy,
            atomic_writes: false,
            label: "cache".to_string(),
            stats: CacheStats::new(),
        }
    }

    /// Wraps each `set` in one storage transaction.
    pub fn with_atomic_writes(mut self, atomic_writes: bool) -> Self {
        self.atomic_writes = atomic_writes;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn is_closed(&self) -> bool {
        self.backend.is_none()
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry and resetting
    /// its recency, then drops expired rows and trims to capacity.
    ///
    /// Fails with [`CacheError::Validation`] for an empty key, a non-object
    /// value or a shape mismatch; storage is untouched in that case.
    pub fn set(&mut self, key: &str, value: &Value) -> Result<&mut Self> {
        if self.is_closed() {
            trace!(cache = %self.label, key, "set ignored on closed cache");
            return Ok(self);
        }

        validate_key(key)?;
        if !value.is_object() {
            return Err(CacheError::Validation(format!(
                "value for \"{key}\" must be an object"
            )));
        }
        self.codec.validate(value)?;
        let encoded = self.codec.encode(value)?;

        let now = current_timestamp_ms();
        let row = StoredRow {
            key: key.to_string(),
            value: encoded,
            expires_at: self.policy.expires_at(now),
            created_at: now,
        };
        self.write(&row, now)?;
        Ok(self)
    }

    /// Serializes `value` with serde_json and stores it like [`Cache::set`].
    pub fn set_serialized<T: Serialize>(&mut self, key: &str, value: &T) -> Result<&mut Self> {
        let value = serde_json::to_value(value)?;
        self.set(key, &value)
    }

    fn write(&mut self, row: &StoredRow, now: i64) -> Result<()> {
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };

        if self.atomic_writes {
            backend.begin()?;
        }

        let outcome = upsert_and_sweep(backend, &self.policy, row, now).and_then(|counts| {
            if self.atomic_writes {
                backend.commit()?;
            }
            Ok(counts)
        });

        match outcome {
            Ok((expired, evicted)) => {
                self.stats.record_sweep(expired, evicted);
                debug!(
                    cache = %self.label,
                    key = %row.key,
                    expired,
                    evicted,
                    "Entry stored"
                );
                Ok(())
            }
            Err(err) => {
                if self.atomic_writes {
                    if let Err(rollback_err) = backend.rollback() {
                        warn!(cache = %self.label, error = %rollback_err, "Rollback failed");
                    }
                }
                Err(err)
            }
        }
    }

    // == Get ==
    /// Returns the live value for `key`, or `None` on a miss.
    ///
    /// An expired row found here is deleted before reporting the miss.
    pub fn get(&mut self, key: &str) -> Result<Option<Value>> {
        if self.is_closed() {
            return Ok(None);
        }
        validate_key(key)?;

        let now = current_timestamp_ms();
        let Some(backend) = self.backend.as_mut() else {
            return Ok(None);
        };

        let Some(row) = backend.get(key)? else {
            self.stats.record_miss();
            trace!(cache = %self.label, key, "Cache miss");
            return Ok(None);
        };

        if self.policy.is_expired(row.expires_at, now) {
            backend.delete(key)?;
            self.stats.record_lazy_expiration();
            self.stats.record_miss();
            debug!(cache = %self.label, key, "Expired entry removed on read");
            return Ok(None);
        }

        let value = self.codec.decode(&row.value)?;
        self.stats.record_hit();
        trace!(cache = %self.label, key, "Cache hit");
        Ok(Some(value))
    }

    /// Fetches `key` and deserializes it into `T`.
    pub fn get_deserialized<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    // == Has ==
    /// Reports whether `key` holds a live entry. Never mutates storage.
    pub fn has(&self, key: &str) -> Result<bool> {
        let Some(backend) = self.backend.as_ref() else {
            return Ok(false);
        };
        validate_key(key)?;

        let now = current_timestamp_ms();
        Ok(backend
            .get(key)?
            .map_or(false, |row| !self.policy.is_expired(row.expires_at, now)))
    }

    // == Delete ==
    /// Removes `key`, returning true iff a row was removed.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        if self.is_closed() {
            return Ok(false);
        }
        validate_key(key)?;

        let Some(backend) = self.backend.as_mut() else {
            return Ok(false);
        };
        let removed = backend.delete(key)? > 0;
        debug!(cache = %self.label, key, removed, "Delete");
        Ok(removed)
    }

    // == Clear ==
    /// Removes every row, live or expired.
    pub fn clear(&mut self) -> Result<()> {
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };
        let removed = backend.delete_where(Predicate::All)?;
        debug!(cache = %self.label, removed, "Cache cleared");
        Ok(())
    }

    // == Size ==
    /// Number of live entries.
    pub fn size(&self) -> Result<usize> {
        let Some(backend) = self.backend.as_ref() else {
            return Ok(0);
        };
        backend.count_where(self.policy.live(current_timestamp_ms()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    // == Stats ==
    /// Counters accumulated since this cache was opened.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    // == Enumeration ==
    /// Materializes every live entry, newest write first.
    ///
    /// All enumeration methods derive from this snapshot. It performs no
    /// writes: expired rows are skipped, not deleted.
    pub fn snapshot(&self) -> Result<Vec<CacheEntry>> {
        let Some(backend) = self.backend.as_ref() else {
            return Ok(Vec::new());
        };
        backend
            .scan(self.policy.live(current_timestamp_ms()))?
            .into_iter()
            .map(|row| CacheEntry::from_row(row, self.codec.as_ref()))
            .collect()
    }

    pub fn keys(&self) -> Result<Keys> {
        Ok(Keys::new(self.snapshot()?))
    }

    pub fn values(&self) -> Result<Values> {
        Ok(Values::new(self.snapshot()?))
    }

    pub fn entries(&self) -> Result<Entries> {
        Ok(Entries::new(self.snapshot()?))
    }

    /// Same as [`Cache::entries`].
    pub fn iter(&self) -> Result<Entries> {
        self.entries()
    }

    /// Calls `f` with each live `(key, value)`, newest first, over a snapshot
    /// taken before the first call.
    pub fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&str, &Value),
    {
        for entry in self.snapshot()? {
            f(&entry.key, &entry.value);
        }
        Ok(())
    }

    // == Close ==
    /// Releases the storage handle. Later calls are no-ops.
    pub fn close(&mut self) {
        let Some(backend) = self.backend.take() else {
            return;
        };
        match backend.close() {
            Ok(()) => info!(cache = %self.label, "Cache closed"),
            Err(err) => warn!(cache = %self.label, error = %err, "Cache closed with error"),
        }
    }
}

/// Upsert, then expiry sweep, then capacity trim. Returns the number of rows
/// swept and evicted.
fn upsert_and_sweep<B: StorageBackend>(
    backend: &mut B,
    policy: &EvictionPolicy,
    row: &StoredRow,
    now: i64,
) -> Result<(usize, usize)> {
    backend.upsert(row)?;
    let expired = backend.delete_where(policy.expired(now))?;
    let evicted = backend.delete_where(policy.over_capacity())?;
    Ok((expired, evicted))
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::Validation("key cannot be empty".to_string()));
    }
    Ok(())
}
