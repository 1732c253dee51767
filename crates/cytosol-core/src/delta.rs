//! Deferred count changes
//!
//! Nothing fired in a round touches the [`StateStore`] directly. Genes and
//! rules add their effects to a [`Delta`], and the scheduler applies the
//! merged delta once at the round boundary.
//!
//! Applying is all-or-nothing: if any record would drop below zero, the
//! store is left untouched.

use crate::{Error, RecordId, Result, StateStore};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Net per-record count changes for one round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    changes: IndexMap<RecordId, i64>,
}

impl Delta {
    /// Create an empty delta
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to a record's pending change
    pub fn add(&mut self, record: &RecordId, amount: i64) {
        if amount == 0 {
            return;
        }
        let entry = self.changes.entry(record.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Increase a record by `quantity`
    pub fn produce(&mut self, record: &RecordId, quantity: u64) {
        self.add(record, clamp(quantity));
    }

    /// Decrease a record by `quantity`
    pub fn consume(&mut self, record: &RecordId, quantity: u64) {
        self.add(record, -clamp(quantity));
    }

    /// Fold another delta into this one
    pub fn merge(&mut self, other: Delta) {
        for (record, amount) in other.changes {
            self.add(&record, amount);
        }
    }

    /// Net change for a record
    pub fn get(&self, record: &RecordId) -> i64 {
        self.changes.get(record).copied().unwrap_or(0)
    }

    /// Iterate over non-zero changes in first-touched order
    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, i64)> {
        self.changes
            .iter()
            .filter(|(_, a)| **a != 0)
            .map(|(r, a)| (r, *a))
    }

    /// Check whether the delta changes nothing
    pub fn is_empty(&self) -> bool {
        self.changes.values().all(|a| *a == 0)
    }

    /// Apply the delta to a store
    ///
    /// Returns whether any count changed. On error the store is unchanged.
    pub fn apply(&self, store: &mut StateStore) -> Result<bool> {
        let mut updates = Vec::with_capacity(self.changes.len());
        for (record, amount) in self.iter() {
            let next = store.get(record) as i128 + amount as i128;
            if next < 0 {
                return Err(Error::NegativeCount {
                    record: record.clone(),
                    count: next,
                });
            }
            let next = u64::try_from(next)
                .map_err(|_| Error::Overflow(format!("count of `{}`", record)))?;
            updates.push((record.clone(), next));
        }

        let changed = !updates.is_empty();
        for (record, count) in updates {
            store.set(record, count);
        }
        Ok(changed)
    }
}

fn clamp(quantity: u64) -> i64 {
    i64::try_from(quantity).unwrap_or(i64::MAX)
}
