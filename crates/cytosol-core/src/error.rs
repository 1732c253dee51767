//! Error types for cytosol-core

use crate::host::HostError;
use crate::report::RunReport;
use crate::{ExternId, RecordId, Type};
use thiserror::Error;

/// Core error type
///
/// Variants up to `InvalidQuantity` are validation errors raised by
/// [`DeclTable::new`](crate::DeclTable::new) and [`Runtime::new`](crate::Runtime::new)
/// before any round runs. The rest are raised while a run is in progress.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Duplicate record definition: {0}")]
    DuplicateRecord(RecordId),

    #[error("Duplicate extern definition: {0}")]
    DuplicateExtern(ExternId),

    #[error("Unknown record `{record}` referenced by {site}")]
    UnknownRecord { record: RecordId, site: String },

    #[error("Unknown extern `{name}` called by {site}")]
    UnknownExtern { name: ExternId, site: String },

    #[error("Unknown type `{ty}` for parameter `{param}` of extern `{name}`")]
    UnknownType {
        name: ExternId,
        param: String,
        ty: String,
    },

    #[error("Parameter `{param}` declared twice on extern `{name}`")]
    DuplicateParameter { name: ExternId, param: String },

    #[error("Call to `{name}` in {site} passes unknown argument `{argument}`")]
    UnknownArgument {
        name: ExternId,
        argument: String,
        site: String,
    },

    #[error("Call to `{name}` in {site} binds argument `{argument}` twice")]
    DuplicateArgument {
        name: ExternId,
        argument: String,
        site: String,
    },

    #[error("Call to `{name}` in {site} is missing argument `{param}`")]
    MissingArgument {
        name: ExternId,
        param: String,
        site: String,
    },

    #[error("Type error in {site}: expected {expected}, got {got}")]
    TypeMismatch {
        site: String,
        expected: Type,
        got: Type,
    },

    #[error("{0} has no trigger record")]
    MissingTrigger(String),

    #[error("Quantity of `{record}` in {site} must be between 1 and {max}", max = i64::MAX)]
    InvalidQuantity { record: RecordId, site: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Integer overflow while evaluating {0}")]
    Overflow(String),

    #[error("Record `{record}` would drop to {count}")]
    NegativeCount { record: RecordId, count: i128 },

    #[error("Extern `{name}` failed in round {round}: {source}")]
    HostFailure {
        name: ExternId,
        round: u64,
        source: HostError,
        /// Everything observed up to and including the failing call
        report: Box<RunReport>,
    },

    #[error("Evaluation failed in round {round}: {source}")]
    Evaluation {
        round: u64,
        source: Box<Error>,
        /// Everything observed up to the failing evaluation
        report: Box<RunReport>,
    },
}

impl Error {
    /// Check whether this error was raised before execution started
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Error::DivisionByZero
                | Error::Overflow(_)
                | Error::NegativeCount { .. }
                | Error::HostFailure { .. }
                | Error::Evaluation { .. }
        )
    }

    /// Get the partial run report of a run stopped by a host failure or an
    /// evaluation error
    pub fn partial_report(&self) -> Option<&RunReport> {
        match self {
            Error::HostFailure { report, .. } | Error::Evaluation { report, .. } => Some(report),
            _ => None,
        }
    }

    pub(crate) fn report_mut(&mut self) -> Option<&mut RunReport> {
        match self {
            Error::HostFailure { report, .. } | Error::Evaluation { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
