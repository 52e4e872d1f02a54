//! Memory Backend Module
//!
//! HashMap storage with a write sequence for stable recency ordering.
//! Nothing survives the process; used for tests and embedding.

use std::collections::HashMap;

use crate::error::Result;
use crate::storage::{Predicate, StorageBackend, StoredRow};

// == Memory Backend ==
#[derive(Debug, Default)]
pub struct MemoryBackend {
    /// Rows keyed by cache key, paired with their write sequence number
    rows: HashMap<String, (StoredRow, u64)>,
    /// Sequence assigned to the next write
    next_seq: u64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows matching `predicate`, newest first.
    fn ordered(&self, predicate: Predicate) -> Vec<&(StoredRow, u64)> {
        let mut rows: Vec<&(StoredRow, u64)> = self
            .rows
            .values()
            .filter(|(row, _)| match predicate {
                Predicate::BeyondCapacity { .. } => true,
                _ => predicate.matches(row),
            })
            .collect();
        rows.sort_by(|(a, a_seq), (b, b_seq)| {
            b.created_at.cmp(&a.created_at).then(b_seq.cmp(a_seq))
        });
        if let Predicate::BeyondCapacity { max } = predicate {
            rows.drain(..max.min(rows.len()));
        }
        rows
    }
}

impl StorageBackend for MemoryBackend {
    fn upsert(&mut self, row: &StoredRow) -> Result<()> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.rows.insert(row.key.clone(), (row.clone(), seq));
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<StoredRow>> {
        Ok(self.rows.get(key).map(|(row, _)| row.clone()))
    }

    fn delete(&mut self, key: &str) -> Result<usize> {
        Ok(usize::from(self.rows.remove(key).is_some()))
    }

    fn delete_where(&mut self, predicate: Predicate) -> Result<usize> {
        let doomed: Vec<String> = self
            .ordered(predicate)
            .into_iter()
            .map(|(row, _)| row.key.clone())
            .collect();
        for key in &doomed {
            self.rows.remove(key);
        }
        Ok(doomed.len())
    }

    fn count_where(&self, predicate: Predicate) -> Result<usize> {
        Ok(self.ordered(predicate).len())
    }

    fn scan(&self, predicate: Predicate) -> Result<Vec<StoredRow>> {
        Ok(self
            .ordered(predicate)
            .into_iter()
            .map(|(row, _)| row.clone())
            .collect())
    }
}
