//! Declaration Table
//!
//! A [`Program`] is the unvalidated declaration list handed over by a
//! loader. [`DeclTable::new`] checks referential integrity and types once,
//! then freezes the result: nothing in the table changes during a run.
//!
//! Validation covers:
//! - duplicate record and extern names
//! - extern parameter types and duplicate parameters
//! - every record named by a factor, guard, action, reactant or product
//! - every call: known extern, all parameters bound exactly once, argument
//!   types matching the declared parameter types
//! - quantities of at least one

use crate::action::Action;
use crate::{Error, ExternId, GeneId, Guard, RecordId, Result, RuleId, Snapshot, Type};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn one() -> u64 {
    1
}

/// A record together with a multiplicity (`2 A` in source)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub record: RecordId,
    #[serde(default = "one")]
    pub quantity: u64,
}

impl Binding {
    /// A single unit of a record
    pub fn one(record: impl Into<RecordId>) -> Self {
        Self {
            record: record.into(),
            quantity: 1,
        }
    }

    /// `quantity` units of a record
    pub fn many(quantity: u64, record: impl Into<RecordId>) -> Self {
        Self {
            record: record.into(),
            quantity,
        }
    }
}

impl From<&str> for Binding {
    fn from(s: &str) -> Self {
        Binding::one(s)
    }
}

/// A named, typed extern parameter as declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    /// Type name (`int`, `string` or `bool`)
    pub ty: String,
}

/// An extern function signature as declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternDecl {
    pub name: ExternId,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

impl ExternDecl {
    /// Create an extern with `(name, type)` parameters
    pub fn new(name: impl Into<ExternId>, params: &[(&str, &str)]) -> Self {
        Self {
            name: name.into(),
            params: params
                .iter()
                .map(|(n, t)| ParamDecl {
                    name: n.to_string(),
                    ty: t.to_string(),
                })
                .collect(),
        }
    }
}

/// A gene as declared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneDecl {
    /// Records that must be present; the first one is the trigger
    pub factors: Vec<Binding>,
    #[serde(default)]
    pub when: Option<Guard>,
    #[serde(default)]
    pub body: Vec<Action>,
}

impl GeneDecl {
    /// Create a gene triggered by one unit of `trigger`
    pub fn new(trigger: impl Into<RecordId>) -> Self {
        Self {
            factors: vec![Binding::one(trigger)],
            when: None,
            body: Vec::new(),
        }
    }

    /// Require an extra factor
    pub fn factor(mut self, binding: impl Into<Binding>) -> Self {
        self.factors.push(binding.into());
        self
    }

    /// Attach a guard
    pub fn when(mut self, guard: Guard) -> Self {
        self.when = Some(guard);
        self
    }

    /// Append an action to the body
    pub fn then(mut self, action: Action) -> Self {
        self.body.push(action);
        self
    }

    /// Append `express record`
    pub fn express(self, record: impl Into<RecordId>) -> Self {
        self.then(Action::express(record))
    }
}

/// A rule as declared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDecl {
    pub reactants: Vec<Binding>,
    /// Products; empty means `nothing`
    #[serde(default)]
    pub products: Vec<Binding>,
    #[serde(default)]
    pub when: Option<Guard>,
}

impl RuleDecl {
    /// `rule(reactants...) -> product`
    pub fn new<B: Into<Binding>>(
        reactants: impl IntoIterator<Item = B>,
        product: impl Into<RecordId>,
    ) -> Self {
        Self {
            reactants: reactants.into_iter().map(Into::into).collect(),
            products: vec![Binding::one(product)],
            when: None,
        }
    }

    /// `rule(reactants...) -> nothing`
    pub fn consume<B: Into<Binding>>(reactants: impl IntoIterator<Item = B>) -> Self {
        Self {
            reactants: reactants.into_iter().map(Into::into).collect(),
            products: Vec::new(),
            when: None,
        }
    }

    /// Add a product
    pub fn product(mut self, binding: impl Into<Binding>) -> Self {
        self.products.push(binding.into());
        self
    }

    /// Attach a guard
    pub fn when(mut self, guard: Guard) -> Self {
        self.when = Some(guard);
        self
    }
}

/// An unvalidated program, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub records: Vec<RecordId>,
    #[serde(default)]
    pub externs: Vec<ExternDecl>,
    #[serde(default)]
    pub genes: Vec<GeneDecl>,
    #[serde(default)]
    pub rules: Vec<RuleDecl>,
}

impl Program {
    /// Create an empty program
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare records
    pub fn records<R: Into<RecordId>>(mut self, names: impl IntoIterator<Item = R>) -> Self {
        self.records.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare an extern
    pub fn extern_fn(mut self, decl: ExternDecl) -> Self {
        self.externs.push(decl);
        self
    }

    /// Declare a gene
    pub fn gene(mut self, gene: GeneDecl) -> Self {
        self.genes.push(gene);
        self
    }

    /// Declare a rule
    pub fn rule(mut self, rule: RuleDecl) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append another program's declarations after this one's
    pub fn merge(&mut self, other: Program) {
        self.records.extend(other.records);
        self.externs.extend(other.externs);
        self.genes.extend(other.genes);
        self.rules.extend(other.rules);
    }
}

/// A validated extern parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

/// A validated extern signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extern {
    pub name: ExternId,
    pub params: Vec<Param>,
}

/// A validated gene
#[derive(Debug, Clone)]
pub struct Gene {
    pub id: GeneId,
    /// The record whose presence triggers this gene
    pub trigger: RecordId,
    /// Required count per record, trigger first
    pub factors: IndexMap<RecordId, u64>,
    pub guard: Option<Guard>,
    /// Actions in declared order; call arguments are in parameter order
    pub body: Vec<Action>,
}

impl Gene {
    /// Check whether every factor is present in sufficient quantity
    pub fn factors_present(&self, snapshot: &Snapshot) -> bool {
        self.factors.iter().all(|(r, q)| snapshot.get(r) >= *q)
    }
}

/// A validated rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: RuleId,
    /// Required count per distinct reactant, first-occurrence order
    pub reactants: IndexMap<RecordId, u64>,
    /// Produced count per distinct product
    pub products: IndexMap<RecordId, u64>,
    pub guard: Option<Guard>,
}

/// The frozen, validated declarations of a program
#[derive(Debug, Clone, Default)]
pub struct DeclTable {
    records: IndexSet<RecordId>,
    externs: IndexMap<ExternId, Extern>,
    genes: Vec<Gene>,
    rules: Vec<Rule>,
    genes_by_trigger: IndexMap<RecordId, Vec<GeneId>>,
    rules_by_reactant: IndexMap<RecordId, Vec<RuleId>>,
    /// Rules without reactants are candidates every round
    unconditional_rules: Vec<RuleId>,
}

impl DeclTable {
    /// Validate a program and build the table
    pub fn new(program: Program) -> Result<Self> {
        let mut table = DeclTable::default();

        for record in program.records {
            if !table.records.insert(record.clone()) {
                return Err(Error::DuplicateRecord(record));
            }
        }

        for decl in program.externs {
            if table.externs.contains_key(&decl.name) {
                return Err(Error::DuplicateExtern(decl.name));
            }
            let ext = table.check_extern(decl)?;
            table.externs.insert(ext.name.clone(), ext);
        }

        for (index, decl) in program.genes.into_iter().enumerate() {
            let gene = table.check_gene(GeneId(index), decl)?;
            table
                .genes_by_trigger
                .entry(gene.trigger.clone())
                .or_default()
                .push(gene.id);
            table.genes.push(gene);
        }

        for (index, decl) in program.rules.into_iter().enumerate() {
            let rule = table.check_rule(RuleId(index), decl)?;
            if rule.reactants.is_empty() {
                table.unconditional_rules.push(rule.id);
            }
            for record in rule.reactants.keys() {
                table
                    .rules_by_reactant
                    .entry(record.clone())
                    .or_default()
                    .push(rule.id);
            }
            table.rules.push(rule);
        }

        Ok(table)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Iterate over record names in declaration order
    pub fn records(&self) -> impl Iterator<Item = &RecordId> {
        self.records.iter()
    }

    /// Check whether a record is declared
    pub fn has_record(&self, record: &RecordId) -> bool {
        self.records.contains(record)
    }

    /// Get an extern signature
    pub fn extern_decl(&self, name: &ExternId) -> Option<&Extern> {
        self.externs.get(name)
    }

    /// Get a gene
    pub fn gene(&self, id: GeneId) -> Option<&Gene> {
        self.genes.get(id.0)
    }

    /// All genes in declaration order
    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    /// Get a rule
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.0)
    }

    /// All rules in declaration order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Genes triggered by a record
    pub fn genes_triggered_by(&self, record: &RecordId) -> &[GeneId] {
        self.genes_by_trigger
            .get(record)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rules consuming a record
    pub fn rules_consuming(&self, record: &RecordId) -> &[RuleId] {
        self.rules_by_reactant
            .get(record)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Genes whose trigger is present, in declaration order
    pub fn candidate_genes(&self, snapshot: &Snapshot) -> BTreeSet<GeneId> {
        snapshot
            .iter()
            .filter(|(_, count)| *count > 0)
            .flat_map(|(record, _)| self.genes_triggered_by(record).iter().copied())
            .collect()
    }

    /// Rules with at least one reactant present (or none needed), in
    /// declaration order
    pub fn candidate_rules(&self, snapshot: &Snapshot) -> BTreeSet<RuleId> {
        let mut out: BTreeSet<RuleId> = self.unconditional_rules.iter().copied().collect();
        out.extend(
            snapshot
                .iter()
                .filter(|(_, count)| *count > 0)
                .flat_map(|(record, _)| self.rules_consuming(record).iter().copied()),
        );
        out
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn check_extern(&self, decl: ExternDecl) -> Result<Extern> {
        let mut params: Vec<Param> = Vec::with_capacity(decl.params.len());
        for p in decl.params {
            if params.iter().any(|q| q.name == p.name) {
                return Err(Error::DuplicateParameter {
                    name: decl.name,
                    param: p.name,
                });
            }
            let ty = match Type::from_name(&p.ty) {
                Some(ty) => ty,
                None => {
                    return Err(Error::UnknownType {
                        name: decl.name,
                        param: p.name,
                        ty: p.ty,
                    })
                }
            };
            params.push(Param { name: p.name, ty });
        }
        Ok(Extern {
            name: decl.name,
            params,
        })
    }

    fn check_gene(&self, id: GeneId, decl: GeneDecl) -> Result<Gene> {
        let site = id.to_string();
        let Some(trigger) = decl.factors.first().map(|b| b.record.clone()) else {
            return Err(Error::MissingTrigger(site));
        };
        let factors = self.check_bindings(&decl.factors, &site)?;

        if let Some(guard) = &decl.when {
            guard.check(&self.records, &format!("{} guard", site))?;
        }

        let mut body = Vec::with_capacity(decl.body.len());
        for action in decl.body {
            body.push(self.check_action(action, &site)?);
        }

        Ok(Gene {
            id,
            trigger,
            factors,
            guard: decl.when,
            body,
        })
    }

    fn check_rule(&self, id: RuleId, decl: RuleDecl) -> Result<Rule> {
        let site = id.to_string();
        let reactants = self.check_bindings(&decl.reactants, &site)?;
        let products = self.check_bindings(&decl.products, &site)?;
        if let Some(guard) = &decl.when {
            guard.check(&self.records, &format!("{} guard", site))?;
        }
        Ok(Rule {
            id,
            reactants,
            products,
            guard: decl.when,
        })
    }

    /// Resolve bindings, summing repeated records
    fn check_bindings(&self, bindings: &[Binding], site: &str) -> Result<IndexMap<RecordId, u64>> {
        let mut out: IndexMap<RecordId, u64> = IndexMap::new();
        for b in bindings {
            self.check_record(&b.record, site)?;
            let total = out
                .get(&b.record)
                .map_or(Some(b.quantity), |q| q.checked_add(b.quantity))
                .filter(|&q| b.quantity != 0 && q <= i64::MAX as u64);
            let Some(total) = total else {
                return Err(Error::InvalidQuantity {
                    record: b.record.clone(),
                    site: site.to_string(),
                });
            };
            out.insert(b.record.clone(), total);
        }
        Ok(out)
    }

    fn check_record(&self, record: &RecordId, site: &str) -> Result<()> {
        if self.records.contains(record) {
            Ok(())
        } else {
            Err(Error::UnknownRecord {
                record: record.clone(),
                site: site.to_string(),
            })
        }
    }

    fn check_action(&self, action: Action, site: &str) -> Result<Action> {
        match action {
            Action::Express(binding) => {
                self.check_bindings(std::slice::from_ref(&binding), site)?;
                Ok(Action::Express(binding))
            }
            Action::Call { name, args } => {
                let ext = self.externs.get(&name).ok_or_else(|| Error::UnknownExtern {
                    name: name.clone(),
                    site: site.to_string(),
                })?;

                let mut bound: IndexMap<String, _> = IndexMap::new();
                for (arg, expr) in args {
                    if bound.contains_key(&arg) {
                        return Err(Error::DuplicateArgument {
                            name,
                            argument: arg,
                            site: site.to_string(),
                        });
                    }
                    let Some(param) = ext.params.iter().find(|p| p.name == arg) else {
                        return Err(Error::UnknownArgument {
                            name,
                            argument: arg,
                            site: site.to_string(),
                        });
                    };
                    let arg_site = format!("{} argument `{}` of `{}`", site, arg, name);
                    let got = expr.type_of(&self.records, &arg_site)?;
                    if got != param.ty {
                        return Err(Error::TypeMismatch {
                            site: arg_site,
                            expected: param.ty,
                            got,
                        });
                    }
                    bound.insert(arg, expr);
                }

                // Rebind in declared parameter order
                let mut ordered = Vec::with_capacity(ext.params.len());
                for param in &ext.params {
                    match bound.swap_remove(&param.name) {
                        Some(expr) => ordered.push((param.name.clone(), expr)),
                        None => {
                            return Err(Error::MissingArgument {
                                name,
                                param: param.name.clone(),
                                site: site.to_string(),
                            })
                        }
                    }
                }
                Ok(Action::Call {
                    name,
                    args: ordered,
                })
            }
        }
    }
}
