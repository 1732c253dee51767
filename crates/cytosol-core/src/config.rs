//! Run configuration - step limit and initial counts
//!
//! A [`RunConfig`] can be built in code or loaded from RON:
//!
//! ```text
//! (
//!     step_limit: 500,
//!     seed: { "Start": 1 },
//! )
//! ```

use crate::RecordId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default maximum number of rounds per run
pub const DEFAULT_STEP_LIMIT: u64 = 10_000;

fn default_step_limit() -> u64 {
    DEFAULT_STEP_LIMIT
}

/// Configuration for a single run
///
/// # Example
///
/// ```
/// use cytosol_core::RunConfig;
///
/// let config = RunConfig::default().with_step_limit(50).with_seed("Start", 1);
/// assert_eq!(config.step_limit(), 50);
/// assert_eq!(config.seed().len(), 1);
///
/// // The step limit never drops below one round
/// assert_eq!(RunConfig::default().with_step_limit(0).step_limit(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum number of rounds, clamped to at least 1
    #[serde(default = "default_step_limit")]
    step_limit: u64,
    /// Initial counts; records not listed start at zero
    #[serde(default)]
    seed: IndexMap<RecordId, u64>,
}

impl RunConfig {
    /// Create a configuration with the default step limit and no seed
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the step limit (clamped to at least 1)
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.set_step_limit(limit);
        self
    }

    /// Seed a record's initial count
    pub fn with_seed(mut self, record: impl Into<RecordId>, count: u64) -> Self {
        self.seed.insert(record.into(), count);
        self
    }

    /// Get the step limit
    pub fn step_limit(&self) -> u64 {
        self.step_limit.max(1)
    }

    /// Set the step limit (clamped to at least 1)
    pub fn set_step_limit(&mut self, limit: u64) {
        self.step_limit = limit.max(1);
    }

    /// Initial counts in insertion order
    pub fn seed(&self) -> &IndexMap<RecordId, u64> {
        &self.seed
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            step_limit: DEFAULT_STEP_LIMIT,
            seed: IndexMap::new(),
        }
    }
}
