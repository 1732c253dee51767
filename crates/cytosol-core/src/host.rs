//! Host interface for extern calls
//!
//! Externs are implemented by the embedding application, not by the
//! engine. Every `call` action a gene performs becomes one [`ExternCall`]
//! passed to [`Host::invoke`], in a deterministic order.

use crate::{ExternId, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure reported by a host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("{0}")]
    Failed(String),
}

impl HostError {
    /// Create a failure with a message
    pub fn failed(message: impl Into<String>) -> Self {
        HostError::Failed(message.into())
    }
}

/// A single extern invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternCall {
    /// Round the calling gene fired in
    pub round: u64,
    pub name: ExternId,
    /// Evaluated arguments in declared parameter order
    pub args: Vec<(String, Value)>,
}

impl ExternCall {
    /// Get an argument by parameter name
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl fmt::Display for ExternCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (name, value)) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, ")")
    }
}

/// Receiver of extern calls
pub trait Host {
    /// Perform one call. An error aborts the run.
    fn invoke(&mut self, call: &ExternCall) -> Result<(), HostError>;
}

impl<F> Host for F
where
    F: FnMut(&ExternCall) -> Result<(), HostError>,
{
    fn invoke(&mut self, call: &ExternCall) -> Result<(), HostError> {
        self(call)
    }
}

/// A host that accepts every call and does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl Host for NullHost {
    fn invoke(&mut self, _call: &ExternCall) -> Result<(), HostError> {
        Ok(())
    }
}

/// A host that records every call it receives
///
/// Can be told to fail the first call to a given extern.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    calls: Vec<ExternCall>,
    fail_on: Option<ExternId>,
}

impl RecordingHost {
    /// Create a host that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first call to `name`
    pub fn fail_on(mut self, name: impl Into<ExternId>) -> Self {
        self.fail_on = Some(name.into());
        self
    }

    /// Calls received so far, including a failed one
    pub fn calls(&self) -> &[ExternCall] {
        &self.calls
    }
}

impl Host for RecordingHost {
    fn invoke(&mut self, call: &ExternCall) -> Result<(), HostError> {
        self.calls.push(call.clone());
        if self.fail_on.as_ref() == Some(&call.name) {
            self.fail_on = None;
            return Err(HostError::failed(format!("`{}` refused", call.name)));
        }
        Ok(())
    }
}
