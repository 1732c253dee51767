//! State Store and round snapshots
//!
//! The store maps every declared record to its count. It is the only
//! mutable state of a run.
//!
//! # Design
//!
//! Counts live behind an `Arc`, so:
//! - **Taking a snapshot is O(1)**: the snapshot clones the `Arc`
//! - **Writing after a snapshot copies once**: `Arc::make_mut` detaches the
//!   store from any snapshot still alive, which then keeps seeing the
//!   pre-round counts

use crate::{DeclTable, RecordId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Ordered record counts
pub type Counts = IndexMap<RecordId, u64>;

/// Mutable mapping from record to count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Counts", into = "Counts")]
pub struct StateStore {
    counts: Arc<Counts>,
}

impl StateStore {
    /// Create a store with every declared record at zero, in declaration order
    pub fn new(table: &DeclTable) -> Self {
        let counts = table.records().map(|r| (r.clone(), 0)).collect();
        Self {
            counts: Arc::new(counts),
        }
    }

    /// Get a record's count (zero if the record was never written)
    pub fn get(&self, record: &RecordId) -> u64 {
        self.counts.get(record).copied().unwrap_or(0)
    }

    /// Set a record's count
    pub fn set(&mut self, record: impl Into<RecordId>, count: u64) {
        Arc::make_mut(&mut self.counts).insert(record.into(), count);
    }

    /// Take an immutable snapshot for the given round
    pub fn snapshot(&self, round: u64) -> Snapshot {
        Snapshot {
            counts: Arc::clone(&self.counts),
            round,
        }
    }

    /// Iterate over (record, count) in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, u64)> {
        self.counts.iter().map(|(r, c)| (r, *c))
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of records tracked
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Check if no record is tracked
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl From<Counts> for StateStore {
    fn from(counts: Counts) -> Self {
        Self {
            counts: Arc::new(counts),
        }
    }
}

impl From<StateStore> for Counts {
    fn from(store: StateStore) -> Self {
        Arc::unwrap_or_clone(store.counts)
    }
}

/// An immutable view of the State Store at the start of a round
///
/// Every guard, reaction and call argument of a round reads from the same
/// snapshot, so nothing fired in a round can observe another firing of that
/// round.
#[derive(Debug, Clone)]
pub struct Snapshot {
    counts: Arc<Counts>,
    round: u64,
}

impl Snapshot {
    /// Get a record's count
    pub fn get(&self, record: &RecordId) -> u64 {
        self.counts.get(record).copied().unwrap_or(0)
    }

    /// Round this snapshot was taken for
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Iterate over (record, count) in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, u64)> {
        self.counts.iter().map(|(r, c)| (r, *c))
    }
}
