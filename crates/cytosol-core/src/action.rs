//! Action Executor
//!
//! Actions are the body of a gene. They run strictly in declared order,
//! once per round the gene is enabled:
//! - `Call` evaluates its arguments against the round snapshot and hands
//!   the call to the [`Host`] immediately
//! - `Express` adds to the round's pending [`Delta`], never to the live
//!   store, so its effect is only visible from the next round on

use crate::decl::Binding;
use crate::{Delta, Error, ExternCall, ExternId, Expr, Host, HostError, RecordId, Snapshot};
use serde::{Deserialize, Serialize};

/// One step of a gene body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Call an extern with named arguments
    Call {
        name: ExternId,
        args: Vec<(String, Expr)>,
    },
    /// Increase a record's count
    Express(Binding),
}

impl Action {
    /// `call name(arg: expr, ...)`
    pub fn call<S: Into<String>>(
        name: impl Into<ExternId>,
        args: impl IntoIterator<Item = (S, Expr)>,
    ) -> Self {
        Action::Call {
            name: name.into(),
            args: args.into_iter().map(|(n, e)| (n.into(), e)).collect(),
        }
    }

    /// `express record`
    pub fn express(record: impl Into<RecordId>) -> Self {
        Action::Express(Binding::one(record))
    }
}

/// Why a gene body stopped before its last action
#[derive(Debug)]
pub enum Interrupt {
    /// An argument failed to evaluate
    Eval(Error),
    /// The host rejected a call
    Host { call: ExternCall, source: HostError },
}

impl From<Error> for Interrupt {
    fn from(err: Error) -> Self {
        Interrupt::Eval(err)
    }
}

/// Execute a gene body
///
/// Every call is appended to `calls` before it is handed to the host, so a
/// rejected call still shows up in the log.
pub fn apply<H: Host + ?Sized>(
    actions: &[Action],
    snapshot: &Snapshot,
    delta: &mut Delta,
    host: &mut H,
    calls: &mut Vec<ExternCall>,
) -> Result<(), Interrupt> {
    for action in actions {
        match action {
            Action::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|(param, expr)| expr.eval(snapshot).map(|v| (param.clone(), v)))
                    .collect::<crate::Result<Vec<_>>>()?;
                let call = ExternCall {
                    round: snapshot.round(),
                    name: name.clone(),
                    args,
                };
                tracing::trace!(round = call.round, call = %call, "extern call");
                calls.push(call.clone());
                if let Err(source) = host.invoke(&call) {
                    return Err(Interrupt::Host { call, source });
                }
            }
            Action::Express(binding) => delta.produce(&binding.record, binding.quantity),
        }
    }
    Ok(())
}
