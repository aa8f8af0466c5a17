//! Expression AST and evaluator.


use common::{DbError, DbResult, Row};
use std::cmp::Ordering;
use std::fmt;
use types::Value;

/// Binary operators, loosest-binding first in the parser's precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Or => "OR",
            BinaryOp::And => "AND",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        };
        f.write_str(s)
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Expression tree produced by the parser.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Identifier(String),
    Literal(Value),
    Star,
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// Evaluation context: the column names of the row being evaluated, in
/// schema order. Column matching is case-sensitive.
pub struct EvalContext<'a> {
    pub columns: &'a [String],
}

impl<'a> EvalContext<'a> {
    pub fn new(columns: &'a [String]) -> Self {
        Self { columns }
    }

    /// Evaluate `expr`, optionally against a row. Identifiers resolve to
    /// the row value by column name; without a row (or for an unknown
    /// name) they evaluate to NULL.
    pub fn eval(&self, expr: &Expr, row: Option<&Row>) -> DbResult<Value> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Identifier(name) => {
                let row = match row {
                    Some(row) => row,
                    None => return Ok(Value::Null),
                };
                match self.columns.iter().position(|c| c == name) {
                    Some(idx) => Ok(row.values.get(idx).cloned().unwrap_or(Value::Null)),
                    None => Ok(Value::Null),
                }
            }
            Expr::Star => Ok(Value::Null),
            Expr::Unary { op, expr } => {
                let v = self.eval(expr, row)?;
                eval_unary(*op, v)
            }
            Expr::Binary { op, left, right } => {
                let lv = self.eval(left, row)?;
                let rv = self.eval(right, row)?;
                eval_binary(*op, lv, rv)
            }
        }
    }

    /// Evaluate as a WHERE predicate: only a non-null `true` passes.
    pub fn matches(&self, expr: &Expr, row: &Row) -> DbResult<bool> {
        Ok(self.eval(expr, Some(row))? == Value::Boolean(true))
    }
}

fn eval_unary(op: UnaryOp, v: Value) -> DbResult<Value> {
    if v.is_null() {
        return Ok(Value::Null);
    }
    match op {
        UnaryOp::Not => match v.as_bool() {
            Some(b) => Ok(Value::Boolean(!b)),
            None => Err(DbError::UnsupportedOperator(format!("NOT {v:?}"))),
        },
        UnaryOp::Neg => match v {
            Value::Integer(i) => Ok(Value::Integer(i.wrapping_neg())),
            Value::Real(r) => Ok(Value::Real(-r)),
            other => Err(DbError::UnsupportedOperator(format!("-{other:?}"))),
        },
    }
}

fn eval_binary(op: BinaryOp, l: Value, r: Value) -> DbResult<Value> {
    use BinaryOp::*;
    match op {
        And => eval_and(l, r),
        Or => eval_or(l, r),
        Eq | Ne | Lt | Le | Gt | Ge => Ok(eval_comparison(op, &l, &r)),
        Add | Sub | Mul | Div => eval_arithmetic(op, l, r),
    }
}

/// Comparisons never propagate NULL: any NULL operand (and any cross-tag
/// pair) compares false.
fn eval_comparison(op: BinaryOp, l: &Value, r: &Value) -> Value {
    if l.is_null() || r.is_null() {
        return Value::Boolean(false);
    }
    let ord = match l.cmp_same_type(r) {
        Some(ord) => ord,
        None => return Value::Boolean(false),
    };
    let result = match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::Ne => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        _ => unreachable!("comparison operator"),
    };
    Value::Boolean(result)
}

/// AND is false if either side is a non-null false, NULL if a remaining
/// side is NULL.
fn eval_and(l: Value, r: Value) -> DbResult<Value> {
    let lb = truth(&l)?;
    let rb = truth(&r)?;
    match (lb, rb) {
        (Some(false), _) | (_, Some(false)) => Ok(Value::Boolean(false)),
        (None, _) | (_, None) => Ok(Value::Null),
        (Some(a), Some(b)) => Ok(Value::Boolean(a && b)),
    }
}

/// OR is true if either side is a non-null true, NULL if a remaining side
/// is NULL.
fn eval_or(l: Value, r: Value) -> DbResult<Value> {
    let lb = truth(&l)?;
    let rb = truth(&r)?;
    match (lb, rb) {
        (Some(true), _) | (_, Some(true)) => Ok(Value::Boolean(true)),
        (None, _) | (_, None) => Ok(Value::Null),
        (Some(a), Some(b)) => Ok(Value::Boolean(a || b)),
    }
}

fn truth(v: &Value) -> DbResult<Option<bool>> {
    match v {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(*b)),
        other => Err(DbError::UnsupportedOperator(format!(
            "logical operator on {other:?}"
        ))),
    }
}

/// Integer arithmetic stays Integer, any Real promotes, `+` concatenates
/// Text. NULL operands yield NULL.
fn eval_arithmetic(op: BinaryOp, l: Value, r: Value) -> DbResult<Value> {
    use BinaryOp::*;
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }

    match (l, r) {
        (Value::Integer(a), Value::Integer(b)) => match op {
            Add => Ok(Value::Integer(a.wrapping_add(b))),
            Sub => Ok(Value::Integer(a.wrapping_sub(b))),
            Mul => Ok(Value::Integer(a.wrapping_mul(b))),
            Div => {
                if b == 0 {
                    Err(DbError::DivisionByZero)
                } else {
                    Ok(Value::Integer(a.wrapping_div(b)))
                }
            }
            _ => unreachable!("arithmetic operator"),
        },
        (l, r) if numeric(&l) && numeric(&r) => {
            let a = as_real(&l);
            let b = as_real(&r);
            match op {
                Add => Ok(Value::Real(a + b)),
                Sub => Ok(Value::Real(a - b)),
                Mul => Ok(Value::Real(a * b)),
                Div => {
                    if b == 0.0 {
                        Err(DbError::DivisionByZero)
                    } else {
                        Ok(Value::Real(a / b))
                    }
                }
                _ => unreachable!("arithmetic operator"),
            }
        }
        (Value::Text(a), Value::Text(b)) if op == Add => Ok(Value::Text(a + &b)),
        (l, r) => Err(DbError::UnsupportedOperator(format!("{l:?} {op} {r:?}"))),
    }
}

fn numeric(v: &Value) -> bool {
    matches!(v, Value::Integer(_) | Value::Real(_))
}

fn as_real(v: &Value) -> f64 {
    match v {
        Value::Integer(i) => *i as f64,
        Value::Real(r) => *r,
        _ => unreachable!("checked numeric"),
    }
}
