//! Run Report - the observable output of a run

use crate::{ExternCall, RecordId, StateStore, Termination};
use serde::{Deserialize, Serialize};

/// Final counts, call log and termination reason of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// State Store after the last committed round
    pub final_state: StateStore,
    /// Every extern call made, in firing order
    pub calls: Vec<ExternCall>,
    /// Why the run stopped; `None` if an error aborted it
    pub termination: Option<Termination>,
    /// Number of rounds started
    pub rounds: u64,
}

impl RunReport {
    /// Final count of a record
    pub fn count(&self, record: &str) -> u64 {
        self.final_state.get(&RecordId::new(record))
    }

    /// Calls made to one extern, in firing order
    pub fn calls_to<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ExternCall> + 'a {
        self.calls.iter().filter(move |c| c.name.as_str() == name)
    }

    /// Check whether the run reached a fixpoint
    pub fn is_fixpoint(&self) -> bool {
        self.termination == Some(Termination::Fixpoint)
    }

    /// Check whether the run hit the step limit
    pub fn hit_step_limit(&self) -> bool {
        self.termination == Some(Termination::StepLimit)
    }
}
