//! Expression engine for guards and call arguments
//!
//! Expressions are declared with the program and evaluated at runtime
//! against a round's [`Snapshot`]. They are type-checked once during
//! validation, so evaluation only fails on arithmetic errors.

use crate::{Error, RecordId, Result, Snapshot, Type, Value};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    /// Equal (`=`)
    Eq,
    /// Not equal (`!=`)
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

impl CmpOp {
    /// Compare two integers
    pub fn compare(&self, a: i64, b: i64) -> bool {
        match self {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }
    }

    /// Whether the operator only applies to integers
    pub fn is_ordering(&self) -> bool {
        !matches!(self, CmpOp::Eq | CmpOp::Ne)
    }

    /// Get the source symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// An expression that can be evaluated to produce a Value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    // === Literals ===
    /// A literal value
    Literal(Value),

    // === State Access ===
    /// Current count of a record (`[R]` in source)
    Concentration(RecordId),

    // === Arithmetic ===
    /// Add two integers, or concatenate two strings
    Add(Box<Expr>, Box<Expr>),
    /// Subtract second from first
    Sub(Box<Expr>, Box<Expr>),
    /// Multiply two expressions
    Mul(Box<Expr>, Box<Expr>),
    /// Divide first by second, truncating
    Div(Box<Expr>, Box<Expr>),
    /// Negate an integer
    Neg(Box<Expr>),

    // === Comparison ===
    /// Compare two values
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate this expression against a snapshot
    pub fn eval(&self, snapshot: &Snapshot) -> Result<Value> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Concentration(record) => {
                let count = snapshot.get(record);
                let count = i64::try_from(count)
                    .map_err(|_| Error::Overflow(format!("[{}]", record)))?;
                Ok(Value::Int(count))
            }
            Expr::Add(a, b) => match (a.eval(snapshot)?, b.eval(snapshot)?) {
                (Value::String(mut x), Value::String(y)) => {
                    x.push_str(&y);
                    Ok(Value::String(x))
                }
                (va, vb) => int_op(&va, &vb, "+", i64::checked_add),
            },
            Expr::Sub(a, b) => int_op(&a.eval(snapshot)?, &b.eval(snapshot)?, "-", i64::checked_sub),
            Expr::Mul(a, b) => int_op(&a.eval(snapshot)?, &b.eval(snapshot)?, "*", i64::checked_mul),
            Expr::Div(a, b) => {
                let va = a.eval(snapshot)?;
                let vb = b.eval(snapshot)?;
                if vb.as_int() == Some(0) {
                    return Err(Error::DivisionByZero);
                }
                int_op(&va, &vb, "/", i64::checked_div)
            }
            Expr::Neg(a) => {
                let va = a.eval(snapshot)?;
                let i = expect_int(&va)?;
                i.checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| Error::Overflow(format!("-{}", i)))
            }
            Expr::Cmp(op, a, b) => {
                let va = a.eval(snapshot)?;
                let vb = b.eval(snapshot)?;
                let result = match (op, &va, &vb) {
                    (CmpOp::Eq, _, _) => va == vb,
                    (CmpOp::Ne, _, _) => va != vb,
                    (op, Value::Int(x), Value::Int(y)) => op.compare(*x, *y),
                    _ => {
                        return Err(Error::TypeMismatch {
                            site: format!("`{}` comparison", op.symbol()),
                            expected: Type::Int,
                            got: if va.ty() == Type::Int { vb.ty() } else { va.ty() },
                        })
                    }
                };
                Ok(Value::Bool(result))
            }
        }
    }

    /// Infer the static type of this expression
    ///
    /// Every concentration read must name a record in `records`.
    pub fn type_of(&self, records: &IndexSet<RecordId>, site: &str) -> Result<Type> {
        match self {
            Expr::Literal(v) => Ok(v.ty()),
            Expr::Concentration(record) => {
                if records.contains(record) {
                    Ok(Type::Int)
                } else {
                    Err(Error::UnknownRecord {
                        record: record.clone(),
                        site: site.to_string(),
                    })
                }
            }
            Expr::Add(a, b) => {
                let ta = a.type_of(records, site)?;
                let tb = b.type_of(records, site)?;
                match (ta, tb) {
                    (Type::Int, Type::Int) => Ok(Type::Int),
                    (Type::String, Type::String) => Ok(Type::String),
                    (Type::String, got) => mismatch(site, Type::String, got),
                    (Type::Int, got) => mismatch(site, Type::Int, got),
                    (got, _) => mismatch(site, Type::Int, got),
                }
            }
            Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                expect_type(a.type_of(records, site)?, Type::Int, site)?;
                expect_type(b.type_of(records, site)?, Type::Int, site)?;
                Ok(Type::Int)
            }
            Expr::Neg(a) => {
                expect_type(a.type_of(records, site)?, Type::Int, site)?;
                Ok(Type::Int)
            }
            Expr::Cmp(op, a, b) => {
                let ta = a.type_of(records, site)?;
                let tb = b.type_of(records, site)?;
                if op.is_ordering() {
                    expect_type(ta, Type::Int, site)?;
                }
                expect_type(tb, ta, site)?;
                Ok(Type::Bool)
            }
        }
    }

    /// Create a literal expression
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Create a concentration read
    pub fn conc(record: impl Into<RecordId>) -> Self {
        Expr::Concentration(record.into())
    }

    /// Create a comparison
    pub fn cmp(op: CmpOp, a: Expr, b: Expr) -> Self {
        Expr::Cmp(op, Box::new(a), Box::new(b))
    }

    /// Create an addition (or concatenation)
    pub fn add(a: Expr, b: Expr) -> Self {
        Expr::Add(Box::new(a), Box::new(b))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::String(s)) => write!(f, "{:?}", s),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Concentration(r) => write!(f, "[{}]", r),
            Expr::Add(a, b) => write!(f, "({} + {})", a, b),
            Expr::Sub(a, b) => write!(f, "({} - {})", a, b),
            Expr::Mul(a, b) => write!(f, "({} * {})", a, b),
            Expr::Div(a, b) => write!(f, "({} / {})", a, b),
            Expr::Neg(a) => write!(f, "-{}", a),
            Expr::Cmp(op, a, b) => write!(f, "{} {} {}", a, op.symbol(), b),
        }
    }
}

fn int_op(a: &Value, b: &Value, symbol: &str, op: fn(i64, i64) -> Option<i64>) -> Result<Value> {
    let x = expect_int(a)?;
    let y = expect_int(b)?;
    op(x, y)
        .map(Value::Int)
        .ok_or_else(|| Error::Overflow(format!("{} {} {}", x, symbol, y)))
}

fn expect_int(v: &Value) -> Result<i64> {
    v.as_int().ok_or_else(|| Error::TypeMismatch {
        site: "arithmetic".to_string(),
        expected: Type::Int,
        got: v.ty(),
    })
}

fn expect_type(got: Type, expected: Type, site: &str) -> Result<()> {
    if got == expected {
        Ok(())
    } else {
        mismatch(site, expected, got)
    }
}

fn mismatch<T>(site: &str, expected: Type, got: Type) -> Result<T> {
    Err(Error::TypeMismatch {
        site: site.to_string(),
        expected,
        got,
    })
}
