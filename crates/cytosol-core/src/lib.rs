//! Cytosol Core - round-based execution engine for gene expression networks
//!
//! This crate provides the data model and runtime for cytosol programs:
//! - Records, externs, genes and rules (`Program`, `DeclTable`)
//! - Record counts with O(1) round snapshots (`StateStore`, `Snapshot`)
//! - Expressions and guards over record counts (`Expr`, `Guard`)
//! - The Action Executor and the `Host` interface for extern calls
//! - The Reaction Resolver with ordered reservation
//! - The round scheduler (`Runtime`) and its `RunReport`
//!
//! ## Rounds
//!
//! Every round reads one snapshot, fires every enabled gene and rule in
//! declaration order, and commits all count changes at once. A run stops
//! at a fixpoint or when the configured step limit is reached.
//!
//! ## Journal Feature
//!
//! Enable the `journal` feature for per-round recording and replay:
//! ```toml
//! cytosol-core = { version = "0.1", features = ["journal"] }
//! ```

pub mod action;
mod config;
pub mod decl;
mod delta;
mod error;
mod expr;
pub mod guard;
mod host;
mod identity;
pub mod reaction;
mod report;
pub mod runtime;
mod state;
mod value;

#[cfg(feature = "journal")]
pub mod journal;

pub use action::Action;
pub use config::{RunConfig, DEFAULT_STEP_LIMIT};
pub use decl::{
    Binding, DeclTable, Extern, ExternDecl, Gene, GeneDecl, Param, ParamDecl, Program, Rule,
    RuleDecl,
};
pub use delta::Delta;
pub use error::{Error, Result};
pub use expr::{CmpOp, Expr};
pub use guard::Guard;
pub use host::{ExternCall, Host, HostError, NullHost, RecordingHost};
pub use identity::{ExternId, GeneId, RecordId, RuleId};
pub use report::RunReport;
pub use runtime::{RoundOutcome, Runtime, Status, Termination};
pub use state::{Counts, Snapshot, StateStore};
pub use value::{Type, Value};

#[cfg(feature = "journal")]
pub use journal::{
    Journal, JournalConfig, JournalEntry, JournalStats, SnapshotId, StateSnapshot,
};
