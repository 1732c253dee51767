//! Scheduler - the round-based runtime
//!
//! Each round:
//! 1. Snapshot the State Store
//! 2. Pick the enabled genes and resolve the rules against the snapshot
//! 3. Run the enabled genes' bodies in declaration order; calls go to the
//!    host immediately, expressions go to the round's pending delta
//! 4. Commit gene and rule deltas to the store in one step
//! 5. Stop at a fixpoint (nothing fired, nothing changed) or when the
//!    step limit is reached
//!
//! Nothing fired in a round can observe anything else fired in the same
//! round, so the result only depends on declaration order.

use crate::action::{self, Interrupt};
use crate::{
    guard, reaction, DeclTable, Delta, Error, ExternCall, GeneId, Host, Result, RuleId, RunConfig,
    RunReport, Snapshot, StateStore,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// A round fired nothing and changed nothing
    Fixpoint,
    /// The configured number of rounds ran without reaching a fixpoint
    StepLimit,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Fixpoint => write!(f, "fixpoint"),
            Termination::StepLimit => write!(f, "step-limit"),
        }
    }
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Stopped(Termination),
    /// A round was interrupted by an error; `reset` before running again
    Failed,
}

/// What happened in one round
#[derive(Debug, Clone, Default)]
pub struct RoundOutcome {
    /// Round number, starting at 1
    pub round: u64,
    /// Genes that fired, in declaration order
    pub genes: Vec<GeneId>,
    /// Rules that fired, in declaration order
    pub rules: Vec<RuleId>,
    /// Calls made, in firing order
    pub calls: Vec<ExternCall>,
    /// Combined delta committed at the end of the round
    pub delta: Delta,
    /// Whether any count changed
    pub changed: bool,
}

impl RoundOutcome {
    /// Check whether this round is a fixpoint
    pub fn is_fixpoint(&self) -> bool {
        self.genes.is_empty() && self.rules.is_empty() && !self.changed
    }
}

/// Drives rounds over a shared declaration table
pub struct Runtime {
    table: Arc<DeclTable>,
    config: RunConfig,
    round: u64,
    status: Status,
}

impl Runtime {
    /// Create a runtime
    ///
    /// Fails if the configuration seeds an undeclared record.
    pub fn new(table: Arc<DeclTable>, config: RunConfig) -> Result<Self> {
        if let Some(record) = config.seed().keys().find(|r| !table.has_record(r)) {
            return Err(Error::UnknownRecord {
                record: record.clone(),
                site: "run configuration seed".to_string(),
            });
        }
        Ok(Self {
            table,
            config,
            round: 0,
            status: Status::Running,
        })
    }

    /// Get the declaration table
    pub fn table(&self) -> &Arc<DeclTable> {
        &self.table
    }

    /// Get the run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Number of rounds started since the last reset
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Current scheduler state
    pub fn status(&self) -> Status {
        self.status
    }

    /// Return to round 0 and `Running`
    pub fn reset(&mut self) {
        self.round = 0;
        self.status = Status::Running;
    }

    /// Every declared record at zero, then the configured seed
    pub fn initial_state(&self) -> StateStore {
        let mut state = StateStore::new(&self.table);
        for (record, count) in self.config.seed() {
            state.set(record.clone(), *count);
        }
        state
    }

    /// Run from the initial state until a terminal state
    pub fn run<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<RunReport> {
        let state = self.initial_state();
        self.run_from(state, host)
    }

    /// Run from a caller-supplied state until a terminal state
    pub fn run_from<H: Host + ?Sized>(
        &mut self,
        state: StateStore,
        host: &mut H,
    ) -> Result<RunReport> {
        self.drive(state, host, |_, _| {})
    }

    fn drive<H, F>(&mut self, mut state: StateStore, host: &mut H, mut on_round: F) -> Result<RunReport>
    where
        H: Host + ?Sized,
        F: FnMut(&RoundOutcome, &StateStore),
    {
        self.reset();
        let mut calls: Vec<ExternCall> = Vec::new();

        let termination = loop {
            if let Status::Stopped(termination) = self.status {
                break termination;
            }
            match self.step(&mut state, host) {
                Ok(mut outcome) => {
                    calls.append(&mut outcome.calls);
                    on_round(&outcome, &state);
                }
                Err(mut err) => {
                    if let Some(report) = err.report_mut() {
                        calls.append(&mut report.calls);
                        report.calls = calls;
                    }
                    return Err(err);
                }
            }
        };

        Ok(RunReport {
            final_state: state,
            calls,
            termination: Some(termination),
            rounds: self.round,
        })
    }

    /// Run exactly one round
    ///
    /// If the round is interrupted by a host failure or an evaluation error
    /// in a gene body, the gene expressions accumulated before the failure
    /// and the round's rule deltas are committed, the runtime moves to
    /// `Failed`, and the error carries a report of this round.
    pub fn step<H: Host + ?Sized>(
        &mut self,
        state: &mut StateStore,
        host: &mut H,
    ) -> Result<RoundOutcome> {
        let result = self.execute_round(state, host);
        if result.is_err() {
            self.status = Status::Failed;
        }
        result
    }

    fn execute_round<H: Host + ?Sized>(
        &mut self,
        state: &mut StateStore,
        host: &mut H,
    ) -> Result<RoundOutcome> {
        self.round += 1;
        let snapshot = state.snapshot(self.round);
        let mut outcome = RoundOutcome {
            round: self.round,
            ..Default::default()
        };

        let selected = self
            .select_genes(&snapshot, &mut outcome.genes)
            .and_then(|()| reaction::resolve(&self.table, &snapshot));
        let resolution = match selected {
            Ok(resolution) => resolution,
            Err(source) => return Err(self.evaluation_failure(source, state.clone(), Vec::new())),
        };

        let mut delta = Delta::new();
        let mut interrupted = None;
        for id in &outcome.genes {
            let Some(gene) = self.table.gene(*id) else {
                continue;
            };
            if let Err(interrupt) = action::apply(
                &gene.body,
                &snapshot,
                &mut delta,
                host,
                &mut outcome.calls,
            ) {
                interrupted = Some((*id, interrupt));
                break;
            }
        }

        outcome.rules = resolution.fired;
        delta.merge(resolution.delta);

        if let Some((gene, interrupt)) = interrupted {
            delta.apply(state)?;
            return Err(match interrupt {
                Interrupt::Eval(source) => {
                    self.evaluation_failure(source, state.clone(), outcome.calls)
                }
                Interrupt::Host { call, source } => {
                    tracing::error!(
                        round = self.round,
                        gene = %gene,
                        call = %call,
                        error = %source,
                        "extern call failed"
                    );
                    Error::HostFailure {
                        name: call.name,
                        round: self.round,
                        source,
                        report: Box::new(RunReport {
                            final_state: state.clone(),
                            calls: outcome.calls,
                            termination: None,
                            rounds: self.round,
                        }),
                    }
                }
            });
        }

        outcome.changed = delta.apply(state)?;
        outcome.delta = delta;

        tracing::debug!(
            round = self.round,
            genes = outcome.genes.len(),
            rules = outcome.rules.len(),
            calls = outcome.calls.len(),
            changed = outcome.changed,
            "round committed"
        );

        if outcome.is_fixpoint() {
            tracing::info!(round = self.round, "fixpoint reached");
            self.status = Status::Stopped(Termination::Fixpoint);
        } else if self.round >= self.config.step_limit() {
            tracing::warn!(
                round = self.round,
                step_limit = self.config.step_limit(),
                "step limit reached before fixpoint"
            );
            self.status = Status::Stopped(Termination::StepLimit);
        }

        Ok(outcome)
    }

    /// Collect the genes whose factors are present and whose guard holds
    fn select_genes(&self, snapshot: &Snapshot, genes: &mut Vec<GeneId>) -> Result<()> {
        for id in self.table.candidate_genes(snapshot) {
            let Some(gene) = self.table.gene(id) else {
                continue;
            };
            if gene.factors_present(snapshot) && guard::holds(gene.guard.as_ref(), snapshot)? {
                genes.push(id);
            }
        }
        Ok(())
    }

    fn evaluation_failure(
        &self,
        source: Error,
        final_state: StateStore,
        calls: Vec<ExternCall>,
    ) -> Error {
        tracing::error!(round = self.round, error = %source, "evaluation failed");
        Error::Evaluation {
            round: self.round,
            source: Box::new(source),
            report: Box::new(RunReport {
                final_state,
                calls,
                termination: None,
                rounds: self.round,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{Binding, ExternDecl, GeneDecl, Program, RuleDecl};
    use crate::{reaction, Action, CmpOp, Expr, Guard, NullHost, RecordId, RecordingHost, Value};

    fn runtime(program: Program, config: RunConfig) -> Runtime {
        let table = DeclTable::new(program).unwrap();
        Runtime::new(Arc::new(table), config).unwrap()
    }

    fn print(message: &str) -> Action {
        Action::call("print", [("message", Expr::lit(message))])
    }

    fn print_extern() -> ExternDecl {
        ExternDecl::new("print", &[("message", "string")])
    }

    fn messages(report: &RunReport) -> Vec<String> {
        report
            .calls_to("print")
            .filter_map(|c| c.arg("message").and_then(Value::as_str).map(String::from))
            .collect()
    }

    #[test]
    fn test_unguarded_gene_expresses_after_first_round() {
        let mut rt = runtime(
            Program::new()
                .records(["T", "X"])
                .gene(GeneDecl::new("T").express("X")),
            RunConfig::default().with_seed("T", 1),
        );
        let mut state = rt.initial_state();
        let outcome = rt.step(&mut state, &mut NullHost).unwrap();

        assert_eq!(outcome.round, 1);
        assert_eq!(outcome.genes, vec![GeneId(0)]);
        assert_eq!(state.get(&RecordId::new("X")), 1);
        assert_eq!(rt.status(), Status::Running);
    }

    // guarded variant: test_self_inhibiting_gene_reaches_fixpoint_in_round_two
    #[test]
    fn test_level_triggered_gene_hits_step_limit() {
        let mut rt = runtime(
            Program::new()
                .records(["T", "X"])
                .gene(GeneDecl::new("T").express("X")),
            RunConfig::default().with_seed("T", 1).with_step_limit(5),
        );
        let report = rt.run(&mut NullHost).unwrap();
        assert!(report.hit_step_limit());
        assert_eq!(report.rounds, 5);
        assert_eq!(report.count("X"), 5);
        assert_eq!(rt.status(), Status::Stopped(Termination::StepLimit));
    }

    #[test]
    fn test_self_inhibiting_gene_reaches_fixpoint_in_round_two() {
        let mut rt = runtime(
            Program::new()
                .records(["T", "X"])
                .gene(GeneDecl::new("T").when(Guard::equals("X", 0)).express("X")),
            RunConfig::default().with_seed("T", 1),
        );
        let report = rt.run(&mut NullHost).unwrap();
        assert!(report.is_fixpoint());
        assert_eq!(report.rounds, 2);
        assert_eq!(report.count("X"), 1);
    }

    #[test]
    fn test_guarded_gene() {
        let mut rt = runtime(
            Program::new()
                .records(["Start", "Inhibitor", "A"])
                .gene(
                    GeneDecl::new("Start")
                        .when(Guard::equals("Inhibitor", 0))
                        .express("Inhibitor")
                        .express("A"),
                ),
            RunConfig::default().with_seed("Start", 1),
        );
        let report = rt.run(&mut NullHost).unwrap();
        assert_eq!(report.termination, Some(Termination::Fixpoint));
        assert_eq!(report.rounds, 2);
        assert_eq!(report.count("Start"), 1);
        assert_eq!(report.count("Inhibitor"), 1);
        assert_eq!(report.count("A"), 1);
    }

    #[test]
    fn test_catalyst_rule() {
        let mut rt = runtime(
            Program::new()
                .records(["RemoveStart", "Start", "Inhibitor"])
                .rule(RuleDecl::new(["RemoveStart", "Start", "Inhibitor"], "RemoveStart")),
            RunConfig::default()
                .with_seed("RemoveStart", 1)
                .with_seed("Start", 1)
                .with_seed("Inhibitor", 1),
        );
        let mut state = rt.initial_state();

        let first = rt.step(&mut state, &mut NullHost).unwrap();
        assert_eq!(first.rules, vec![RuleId(0)]);
        assert_eq!(state.get(&RecordId::new("RemoveStart")), 1);
        assert_eq!(state.get(&RecordId::new("Start")), 0);
        assert_eq!(state.get(&RecordId::new("Inhibitor")), 0);

        let second = rt.step(&mut state, &mut NullHost).unwrap();
        assert!(second.rules.is_empty());
        assert!(second.is_fixpoint());
        assert_eq!(rt.status(), Status::Stopped(Termination::Fixpoint));
    }

    fn cascade() -> Program {
        let stage = |start: &str, inhibit: &str, name: &str, next: Option<&str>| {
            let gene = GeneDecl::new(start)
                .when(Guard::equals(inhibit, 0))
                .then(print(name))
                .express(inhibit);
            match next {
                Some(next) => gene.express(next),
                None => gene,
            }
        };
        Program::new()
            .records(["StartA", "InhibitA", "StartB", "InhibitB", "StartC", "InhibitC"])
            .extern_fn(print_extern())
            .gene(stage("StartC", "InhibitC", "C", None))
            .gene(stage("StartB", "InhibitB", "B", Some("StartC")))
            .gene(stage("StartA", "InhibitA", "A", Some("StartB")))
    }

    #[test]
    fn test_cascade_calls_each_stage_once_in_order() {
        let mut rt = runtime(cascade(), RunConfig::default().with_seed("StartA", 1));
        let mut host = RecordingHost::new();
        let report = rt.run(&mut host).unwrap();

        assert!(report.is_fixpoint());
        assert_eq!(messages(&report), vec!["A", "B", "C"]);
        let rounds: Vec<_> = report.calls.iter().map(|c| c.round).collect();
        assert_eq!(rounds, vec![1, 2, 3]);
        assert_eq!(report.rounds, 4);
        assert_eq!(host.calls(), report.calls.as_slice());
    }

    #[test]
    fn test_catalytic_cycle_hits_step_limit() {
        let mut rt = runtime(
            Program::new()
                .records(["Catalyst", "Fuel", "Waste"])
                .gene(GeneDecl::new("Catalyst").express("Fuel"))
                .rule(
                    RuleDecl::new(["Catalyst", "Fuel"], "Catalyst").product("Waste"),
                ),
            RunConfig::default().with_seed("Catalyst", 1).with_step_limit(20),
        );
        let report = rt.run(&mut NullHost).unwrap();
        assert_eq!(report.termination, Some(Termination::StepLimit));
        assert_eq!(report.rounds, 20);
        assert_eq!(report.count("Catalyst"), 1);
        // Fuel made in round n is burnt in round n + 1
        assert_eq!(report.count("Waste"), 19);
        assert_eq!(report.count("Fuel"), 1);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let program = cascade()
            .records(["Counter"])
            .rule(RuleDecl::new(["InhibitA", "InhibitB"], "Counter"));
        let config = RunConfig::default().with_seed("StartA", 1);

        let first = runtime(program.clone(), config.clone())
            .run(&mut RecordingHost::new())
            .unwrap();
        let second = runtime(program, config).run(&mut RecordingHost::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fixpoint_is_closed() {
        let mut rt = runtime(cascade(), RunConfig::default().with_seed("StartA", 1));
        let report = rt.run(&mut NullHost).unwrap();
        assert!(report.is_fixpoint());

        let mut state = report.final_state.clone();
        let snap = state.snapshot(0);
        for rule in rt.table().rules() {
            assert!(!reaction::enabled(rule, &snap).unwrap());
        }
        let outcome = rt.step(&mut state, &mut NullHost).unwrap();
        assert!(outcome.genes.is_empty());
        assert!(outcome.rules.is_empty());
        assert_eq!(state, report.final_state);
    }

    #[test]
    fn test_calls_follow_declaration_order_within_round() {
        let mut rt = runtime(
            Program::new()
                .records(["T", "Stop"])
                .extern_fn(print_extern())
                .gene(
                    GeneDecl::new("T")
                        .when(Guard::compare("Stop", CmpOp::Lt, 2))
                        .then(print("first")),
                )
                .gene(
                    GeneDecl::new("T")
                        .when(Guard::compare("Stop", CmpOp::Lt, 2))
                        .then(print("second"))
                        .express("Stop"),
                ),
            RunConfig::default().with_seed("T", 1),
        );
        let report = rt.run(&mut NullHost).unwrap();
        assert!(report.is_fixpoint());
        assert_eq!(messages(&report), vec!["first", "second", "first", "second"]);
        let rounds: Vec<_> = report.calls.iter().map(|c| c.round).collect();
        assert_eq!(rounds, vec![1, 1, 2, 2]);
    }

    #[test]
    fn test_expression_visible_next_round_only() {
        let mut rt = runtime(
            Program::new()
                .records(["A", "B", "C"])
                .gene(GeneDecl::new("A").when(Guard::equals("B", 0)).express("B"))
                .gene(GeneDecl::new("B").when(Guard::equals("C", 0)).express("C")),
            RunConfig::default().with_seed("A", 1),
        );
        let mut state = rt.initial_state();

        let first = rt.step(&mut state, &mut NullHost).unwrap();
        assert_eq!(first.genes, vec![GeneId(0)]);
        let second = rt.step(&mut state, &mut NullHost).unwrap();
        assert_eq!(second.genes, vec![GeneId(1)]);
    }

    #[test]
    fn test_competing_rules_never_overdraw() {
        let mut rt = runtime(
            Program::new()
                .records(["A", "B", "X"])
                .gene(GeneDecl::new("X").when(Guard::compare("A", CmpOp::Lt, 3)).express("A"))
                .rule(RuleDecl::new([Binding::many(2, "A")], "B"))
                .rule(RuleDecl::new(["A", "B"], "X"))
                .rule(RuleDecl::consume(["A"])),
            RunConfig::default().with_seed("X", 1).with_step_limit(30),
        );
        let mut state = rt.initial_state();
        while rt.status() == Status::Running {
            let before = state.clone();
            let outcome = rt.step(&mut state, &mut NullHost).unwrap();
            for (record, count) in before.iter() {
                let change = outcome.delta.get(record);
                assert_eq!(count as i64 + change, state.get(record) as i64);
            }
        }
        assert!(rt.round() <= 30);
    }

    #[test]
    fn test_host_failure_commits_earlier_expressions_and_rules() {
        let mut rt = runtime(
            Program::new()
                .records(["Start", "A", "B", "C", "D"])
                .extern_fn(ExternDecl::new("beep", &[]))
                .gene(
                    GeneDecl::new("Start")
                        .express("A")
                        .then(Action::call("beep", Vec::<(&str, Expr)>::new()))
                        .express("B"),
                )
                .gene(GeneDecl::new("Start").express("C"))
                .rule(RuleDecl::new(["Start"], "D")),
            RunConfig::default().with_seed("Start", 1),
        );
        let mut host = RecordingHost::new().fail_on("beep");
        let err = rt.run(&mut host).unwrap_err();
        assert!(!err.is_validation());

        let report = err.partial_report().unwrap();
        assert_eq!(report.termination, None);
        assert_eq!(report.rounds, 1);
        assert_eq!(report.calls.len(), 1);
        assert_eq!(report.count("A"), 1);
        assert_eq!(report.count("B"), 0);
        assert_eq!(report.count("C"), 0);
        assert_eq!(report.count("D"), 1);
        assert_eq!(report.count("Start"), 0);
        assert!(matches!(err, Error::HostFailure { round: 1, ref name, .. } if name.as_str() == "beep"));
        assert_eq!(rt.status(), Status::Failed);
    }

    #[test]
    fn test_host_failure_report_keeps_earlier_rounds() {
        let mut rt = runtime(
            Program::new()
                .records(["Start", "A"])
                .extern_fn(print_extern())
                .extern_fn(ExternDecl::new("beep", &[]))
                .gene(GeneDecl::new("Start").when(Guard::equals("A", 0)).then(print("x")).express("A"))
                .gene(GeneDecl::new("A").then(Action::call("beep", Vec::<(&str, Expr)>::new()))),
            RunConfig::default().with_seed("Start", 1),
        );
        let err = rt.run(&mut RecordingHost::new().fail_on("beep")).unwrap_err();
        let report = err.partial_report().unwrap();
        let names: Vec<_> = report.calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["print", "beep"]);
        assert_eq!(report.rounds, 2);
    }

    #[test]
    fn test_guard_evaluation_error_stops_run() {
        let mut rt = runtime(
            Program::new().records(["A", "B"]).gene(
                GeneDecl::new("A").when(Guard::new(Expr::cmp(
                    CmpOp::Eq,
                    Expr::Div(Box::new(Expr::conc("A")), Box::new(Expr::conc("B"))),
                    Expr::lit(1i64),
                ))),
            ),
            RunConfig::default().with_seed("A", 1),
        );
        let err = rt.run(&mut NullHost).unwrap_err();
        assert!(!err.is_validation());
        assert!(matches!(err, Error::Evaluation { round: 1, ref source, .. } if matches!(**source, Error::DivisionByZero)));

        let report = err.partial_report().unwrap();
        assert!(report.calls.is_empty());
        assert_eq!(report.count("A"), 1);
        assert_eq!(rt.status(), Status::Failed);
    }

    #[test]
    fn test_argument_evaluation_error_keeps_earlier_calls() {
        let log = |n: Expr| Action::call("log", [("n", n)]);
        let mut rt = runtime(
            Program::new()
                .records(["Start", "Z"])
                .extern_fn(ExternDecl::new("log", &[("n", "int")]))
                .gene(GeneDecl::new("Start").then(log(Expr::lit(1i64))))
                .gene(GeneDecl::new("Start").then(log(Expr::Div(
                    Box::new(Expr::lit(1i64)),
                    Box::new(Expr::conc("Z")),
                )))),
            RunConfig::default().with_seed("Start", 1),
        );
        let mut host = RecordingHost::new();
        let err = rt.run(&mut host).unwrap_err();

        assert!(matches!(err, Error::Evaluation { ref source, .. } if matches!(**source, Error::DivisionByZero)));
        let report = err.partial_report().unwrap();
        assert_eq!(report.termination, None);
        assert_eq!(report.rounds, 1);
        assert_eq!(report.calls.len(), 1);
        assert_eq!(report.calls, host.calls());
        assert_eq!(rt.status(), Status::Failed);

        rt.reset();
        assert_eq!(rt.status(), Status::Running);
    }

    #[test]
    fn test_unknown_seed_record() {
        let table = DeclTable::new(Program::new().records(["A"])).unwrap();
        let result = Runtime::new(Arc::new(table), RunConfig::default().with_seed("Ghost", 1));
        assert!(matches!(result, Err(Error::UnknownRecord { .. })));
    }

    #[test]
    fn test_empty_program_is_immediate_fixpoint() {
        let mut rt = runtime(Program::new().records(["A"]), RunConfig::default());
        let report = rt.run(&mut NullHost).unwrap();
        assert!(report.is_fixpoint());
        assert_eq!(report.rounds, 1);
        assert!(report.calls.is_empty());
    }

    #[test]
    fn test_run_from_supplied_state() {
        let mut rt = runtime(
            Program::new()
                .records(["A", "B"])
                .rule(RuleDecl::new(["A"], "B")),
            RunConfig::default(),
        );
        let mut state = rt.initial_state();
        state.set("A", 3);
        let report = rt.run_from(state, &mut NullHost).unwrap();
        assert_eq!(report.count("A"), 0);
        assert_eq!(report.count("B"), 3);
        assert_eq!(report.rounds, 4);
    }

    #[test]
    fn test_step_limit_of_one() {
        let mut rt = runtime(
            Program::new().records(["T", "X"]).gene(GeneDecl::new("T").express("X")),
            RunConfig::default().with_seed("T", 1).with_step_limit(0),
        );
        let report = rt.run(&mut NullHost).unwrap();
        assert!(report.hit_step_limit());
        assert_eq!(report.rounds, 1);
        assert_eq!(report.count("X"), 1);
    }
}

// ============================================================================
// Journal Integration (feature = "journal")
// ============================================================================

#[cfg(feature = "journal")]
use crate::journal::Journal;

#[cfg(feature = "journal")]
impl Runtime {
    /// Run from the initial state, recording every round to the journal
    pub fn run_with_journal<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        journal: &mut Journal,
    ) -> Result<RunReport> {
        let state = self.initial_state();
        journal.take_snapshot(0, &state);
        self.drive(state, host, |outcome, state| journal.record_round(outcome, state))
    }
}

#[cfg(all(test, feature = "journal"))]
mod journal_tests {
    use super::*;
    use crate::decl::{GeneDecl, Program, RuleDecl};
    use crate::journal::{Journal, JournalConfig};
    use crate::{Guard, NullHost};

    fn program() -> Program {
        Program::new()
            .records(["A", "B", "C"])
            .gene(GeneDecl::new("A").when(Guard::equals("B", 0)).express("B"))
            .rule(RuleDecl::new(["A", "B"], "C"))
    }

    #[test]
    fn test_run_with_journal() {
        let table = Arc::new(DeclTable::new(program()).unwrap());
        let mut rt = Runtime::new(table, RunConfig::default().with_seed("A", 1)).unwrap();
        let mut journal = Journal::new();
        journal.start_recording();

        let report = rt.run_with_journal(&mut NullHost, &mut journal).unwrap();
        let stats = journal.stats();
        assert_eq!(stats.round_count, report.rounds as usize);
        assert_eq!(stats.genes_fired, 1);
        assert_eq!(stats.rules_fired, 1);
    }

    #[test]
    fn test_replay_matches_live_state() {
        let table = Arc::new(DeclTable::new(program()).unwrap());
        let mut rt = Runtime::new(Arc::clone(&table), RunConfig::default().with_seed("A", 2)).unwrap();
        let mut journal = Journal::with_config(JournalConfig {
            recording_enabled: true,
            snapshot_interval: 2,
            ..Default::default()
        });

        let report = rt.run_with_journal(&mut NullHost, &mut journal).unwrap();
        let replayed = journal.replay_to(report.rounds).unwrap();
        assert_eq!(replayed, report.final_state);

        let mut live = rt.initial_state();
        rt.reset();
        rt.step(&mut live, &mut NullHost).unwrap();
        assert_eq!(journal.replay_to(1).unwrap(), live);
    }
}
