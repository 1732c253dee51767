//! Round journal for auditing and replay
//!
//! The journal records, per round, which genes and rules fired, every
//! extern call, and the delta committed to the State Store. Together with
//! periodic state snapshots this is enough to rebuild the store as it was
//! at the end of any recorded round.
//!
//! # Example
//!
//! ```rust,ignore
//! use cytosol_core::{Journal, NullHost, Runtime};
//!
//! let mut journal = Journal::new();
//! journal.start_recording();
//!
//! let report = runtime.run_with_journal(&mut NullHost, &mut journal)?;
//!
//! // State at the end of round 3
//! let state = journal.replay_to(3);
//! ```

use crate::runtime::RoundOutcome;
use crate::{Delta, ExternCall, GeneId, RuleId, StateStore};
use serde::{Deserialize, Serialize};

/// A journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalEntry {
    /// Start of a round
    RoundBoundary { round: u64 },
    /// A gene fired
    GeneFired { round: u64, gene: GeneId },
    /// A rule fired
    RuleFired { round: u64, rule: RuleId },
    /// An extern call was made
    Call(ExternCall),
    /// The round's combined delta was committed
    Committed { round: u64, delta: Delta },
    /// A state snapshot was taken at the end of a round
    Snapshot { round: u64, snapshot_id: SnapshotId },
}

impl JournalEntry {
    /// Round this entry belongs to
    pub fn round(&self) -> u64 {
        match self {
            JournalEntry::RoundBoundary { round }
            | JournalEntry::GeneFired { round, .. }
            | JournalEntry::RuleFired { round, .. }
            | JournalEntry::Committed { round, .. }
            | JournalEntry::Snapshot { round, .. } => *round,
            JournalEntry::Call(call) => call.round,
        }
    }
}

/// Unique identifier for a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub u64);

/// A stored copy of the State Store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub id: SnapshotId,
    /// Round at whose end the snapshot was taken (0 = before the first round)
    pub round: u64,
    pub state: StateStore,
}

/// Configuration for the journal
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Whether recording is enabled
    pub recording_enabled: bool,
    /// Take snapshots every N rounds (0 = only the starting state)
    pub snapshot_interval: u64,
    /// Maximum number of snapshots to keep (0 = unlimited); the starting
    /// state is always kept
    pub max_snapshots: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            recording_enabled: false,
            snapshot_interval: 100,
            max_snapshots: 10,
        }
    }
}

/// Recorder of rounds
#[derive(Debug, Clone, Default)]
pub struct Journal {
    config: JournalConfig,
    entries: Vec<JournalEntry>,
    snapshots: Vec<StateSnapshot>,
    next_snapshot_id: u64,
    last_recorded_round: Option<u64>,
}

impl Journal {
    /// Create a journal with recording disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: JournalConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Start recording rounds
    pub fn start_recording(&mut self) {
        self.config.recording_enabled = true;
    }

    /// Stop recording rounds; existing entries are kept
    pub fn stop_recording(&mut self) {
        self.config.recording_enabled = false;
    }

    /// Check if recording is enabled
    pub fn is_recording(&self) -> bool {
        self.config.recording_enabled
    }

    /// Record a completed round and snapshot the store if due
    pub fn record_round(&mut self, outcome: &RoundOutcome, state: &StateStore) {
        if !self.config.recording_enabled {
            return;
        }
        let round = outcome.round;

        self.entries.push(JournalEntry::RoundBoundary { round });
        self.entries.extend(
            outcome
                .genes
                .iter()
                .map(|&gene| JournalEntry::GeneFired { round, gene }),
        );
        self.entries.extend(
            outcome
                .rules
                .iter()
                .map(|&rule| JournalEntry::RuleFired { round, rule }),
        );
        self.entries
            .extend(outcome.calls.iter().cloned().map(JournalEntry::Call));
        self.entries.push(JournalEntry::Committed {
            round,
            delta: outcome.delta.clone(),
        });
        self.last_recorded_round = Some(round);

        if self.should_snapshot(round) {
            self.take_snapshot(round, state);
        }
    }

    /// Store a copy of the state as of the end of `round`
    pub fn take_snapshot(&mut self, round: u64, state: &StateStore) -> SnapshotId {
        let id = SnapshotId(self.next_snapshot_id);
        self.next_snapshot_id += 1;

        self.snapshots.push(StateSnapshot {
            id,
            round,
            state: state.clone(),
        });
        if self.config.recording_enabled {
            self.entries.push(JournalEntry::Snapshot {
                round,
                snapshot_id: id,
            });
        }

        self.enforce_snapshot_limits();
        id
    }

    /// Check if a snapshot is due at the end of a round
    pub fn should_snapshot(&self, round: u64) -> bool {
        self.config.snapshot_interval != 0 && round % self.config.snapshot_interval == 0
    }

    /// Get all entries
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Get entries in a round range (inclusive)
    pub fn entries_in_range(&self, start: u64, end: u64) -> impl Iterator<Item = &JournalEntry> {
        self.entries
            .iter()
            .filter(move |e| (start..=end).contains(&e.round()))
    }

    /// Calls recorded, in firing order
    pub fn calls(&self) -> impl Iterator<Item = &ExternCall> {
        self.entries.iter().filter_map(|e| match e {
            JournalEntry::Call(call) => Some(call),
            _ => None,
        })
    }

    /// Get all retained snapshots, oldest first
    pub fn snapshots(&self) -> &[StateSnapshot] {
        &self.snapshots
    }

    /// Get the latest snapshot taken at or before a round
    pub fn snapshot_at_or_before(&self, round: u64) -> Option<&StateSnapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.round <= round)
            .max_by_key(|s| s.round)
    }

    /// Rebuild the State Store as of the end of `round`
    ///
    /// Starts from the nearest snapshot and re-applies the committed deltas
    /// of the rounds after it. Returns `None` if no snapshot precedes the
    /// round or the round was never recorded.
    pub fn replay_to(&self, round: u64) -> Option<StateStore> {
        if round > self.last_recorded_round.unwrap_or(0) {
            return None;
        }
        let snapshot = self.snapshot_at_or_before(round)?;
        let mut state = snapshot.state.clone();
        for entry in self.entries_in_range(snapshot.round + 1, round) {
            if let JournalEntry::Committed { delta, .. } = entry {
                delta.apply(&mut state).ok()?;
            }
        }
        Some(state)
    }

    /// Clear all entries and snapshots
    pub fn clear(&mut self) {
        self.entries.clear();
        self.snapshots.clear();
        self.last_recorded_round = None;
    }

    /// Get statistics about the journal
    pub fn stats(&self) -> JournalStats {
        let count = |f: fn(&JournalEntry) -> bool| self.entries.iter().filter(|e| f(e)).count();

        JournalStats {
            total_entries: self.entries.len(),
            round_count: count(|e| matches!(e, JournalEntry::RoundBoundary { .. })),
            genes_fired: count(|e| matches!(e, JournalEntry::GeneFired { .. })),
            rules_fired: count(|e| matches!(e, JournalEntry::RuleFired { .. })),
            call_count: count(|e| matches!(e, JournalEntry::Call(_))),
            snapshot_count: self.snapshots.len(),
            last_round: self.last_recorded_round,
        }
    }

    fn enforce_snapshot_limits(&mut self) {
        let max = self.config.max_snapshots;
        if max > 0 && self.snapshots.len() > max {
            let excess = self.snapshots.len() - max;
            // index 0 is the starting state
            self.snapshots.drain(1..1 + excess);
        }
    }
}

/// Statistics about the journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalStats {
    pub total_entries: usize,
    pub round_count: usize,
    pub genes_fired: usize,
    pub rules_fired: usize,
    pub call_count: usize,
    pub snapshot_count: usize,
    pub last_round: Option<u64>,
}
