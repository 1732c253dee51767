//! Reaction Resolver
//!
//! Decides which rules fire in a round and what they do to the counts.
//!
//! Every rule reads the same round snapshot. When enabled rules compete
//! for the same units, declaration order wins: an `available` counter
//! starts at the snapshot counts, each firing rule reserves its reactants
//! from it, and a rule whose reactants are no longer available is skipped.
//! Products are never added to `available`; they show up next round.

use crate::decl::Rule;
use crate::{guard, DeclTable, Delta, RecordId, Result, RuleId, Snapshot};
use indexmap::IndexMap;

/// Rules chosen for a round and their combined effect
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Fired rules in declaration order
    pub fired: Vec<RuleId>,
    pub delta: Delta,
}

/// Check whether a rule is enabled against a snapshot, ignoring
/// competition from other rules
pub fn enabled(rule: &Rule, snapshot: &Snapshot) -> Result<bool> {
    if !rule.reactants.iter().all(|(r, q)| snapshot.get(r) >= *q) {
        return Ok(false);
    }
    guard::holds(rule.guard.as_ref(), snapshot)
}

/// Two-phase effect of one firing: subtract every reactant, then add
/// every product
pub fn net_delta(rule: &Rule) -> Delta {
    let mut delta = Delta::new();
    for (record, quantity) in &rule.reactants {
        delta.consume(record, *quantity);
    }
    for (record, quantity) in &rule.products {
        delta.produce(record, *quantity);
    }
    delta
}

/// Resolve every rule for a round
pub fn resolve(table: &DeclTable, snapshot: &Snapshot) -> Result<Resolution> {
    let mut available: IndexMap<&RecordId, u64> = IndexMap::new();
    let mut resolution = Resolution::default();

    for id in table.candidate_rules(snapshot) {
        let Some(rule) = table.rule(id) else {
            continue;
        };
        if !enabled(rule, snapshot)? {
            continue;
        }

        let short = rule.reactants.iter().find(|(record, quantity)| {
            let left = *available
                .entry(*record)
                .or_insert_with(|| snapshot.get(record));
            left < **quantity
        });
        if let Some((record, _)) = short {
            tracing::trace!(
                round = snapshot.round(),
                rule = %id,
                record = %record,
                "rule skipped, reactant already reserved"
            );
            continue;
        }

        for (record, quantity) in &rule.reactants {
            if let Some(left) = available.get_mut(record) {
                *left -= quantity;
            }
        }
        resolution.delta.merge(net_delta(rule));
        resolution.fired.push(id);
    }

    Ok(resolution)
}
