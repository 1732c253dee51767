//! Guard evaluator
//!
//! A guard is the `when` side condition of a gene or rule. The common form
//! is a single comparison of one record's count against a literal, built
//! with [`Guard::compare`], but any boolean expression is accepted.

use crate::{CmpOp, Error, Expr, RecordId, Result, Snapshot, Type, Value};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A boolean side condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guard(pub Expr);

impl Guard {
    /// Wrap an arbitrary boolean expression
    pub fn new(expr: Expr) -> Self {
        Self(expr)
    }

    /// `[record] op literal`
    pub fn compare(record: impl Into<RecordId>, op: CmpOp, literal: i64) -> Self {
        Self(Expr::cmp(op, Expr::conc(record), Expr::lit(literal)))
    }

    /// `[record] = literal`
    pub fn equals(record: impl Into<RecordId>, literal: i64) -> Self {
        Self::compare(record, CmpOp::Eq, literal)
    }

    /// Get the guard expression
    pub fn expr(&self) -> &Expr {
        &self.0
    }

    /// Evaluate the guard against a snapshot
    pub fn holds(&self, snapshot: &Snapshot) -> Result<bool> {
        match self.0.eval(snapshot)? {
            Value::Bool(b) => Ok(b),
            other => Err(Error::TypeMismatch {
                site: format!("guard `{}`", self.0),
                expected: Type::Bool,
                got: other.ty(),
            }),
        }
    }

    /// Check that the guard reads declared records and is boolean
    pub fn check(&self, records: &IndexSet<RecordId>, site: &str) -> Result<()> {
        match self.0.type_of(records, site)? {
            Type::Bool => Ok(()),
            got => Err(Error::TypeMismatch {
                site: site.to_string(),
                expected: Type::Bool,
                got,
            }),
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "when {}", self.0)
    }
}

/// Evaluate an optional guard; no guard always holds
pub fn holds(guard: Option<&Guard>, snapshot: &Snapshot) -> Result<bool> {
    match guard {
        Some(guard) => guard.holds(snapshot),
        None => Ok(true),
    }
}
