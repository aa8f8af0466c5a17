//! Access-path selection for SELECT statements.
//!
//! The planner extracts `column OP literal` predicates from the WHERE
//! conjunction and picks one of three access methods: an exact primary-key
//! probe, a primary-key range scan, or a full scan. Equality on the primary
//! key always wins over a range.


use catalog::Schema;
use expr::{BinaryOp, Expr};
use parser::SelectStatement;
use types::Value;

/// How the executor should fetch candidate rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessMethod {
    FullTableScan,
    IndexLookup,
    IndexRangeScan,
}

impl AccessMethod {
    pub fn name(&self) -> &'static str {
        match self {
            AccessMethod::FullTableScan => "FullTableScan",
            AccessMethod::IndexLookup => "IndexLookup",
            AccessMethod::IndexRangeScan => "IndexRangeScan",
        }
    }
}

/// One `column OP literal` term from the WHERE conjunction.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: BinaryOp,
    pub value: Value,
}

/// The chosen access path plus everything EXPLAIN wants to show.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryPlan {
    pub access_method: AccessMethod,
    pub predicates: Vec<Predicate>,
    /// Set when an index access method was chosen.
    pub index_column: Option<String>,
    pub lookup_key: Option<Value>,
    pub range_lower: Option<Value>,
    pub range_upper: Option<Value>,
    pub lower_inclusive: bool,
    pub upper_inclusive: bool,
    /// True when an OR appeared anywhere in the WHERE clause; predicates
    /// beneath it were not extracted.
    pub has_or: bool,
    pub estimated_cost: u64,
}

impl QueryPlan {
    fn full_scan(predicates: Vec<Predicate>, has_or: bool) -> Self {
        Self {
            access_method: AccessMethod::FullTableScan,
            predicates,
            index_column: None,
            lookup_key: None,
            range_lower: None,
            range_upper: None,
            lower_inclusive: false,
            upper_inclusive: false,
            has_or,
            estimated_cost: 100,
        }
    }
}

/// Plan a SELECT against its table schema.
pub fn plan_select(stmt: &SelectStatement, schema: &Schema) -> QueryPlan {
    let mut predicates = Vec::new();
    let mut has_or = false;
    if let Some(selection) = &stmt.selection {
        collect_conjuncts(selection, &mut predicates, &mut has_or);
    }

    let pk_column = match schema.primary_key_index() {
        Some(idx) => match schema.column(idx) {
            Some(column) => column.name.clone(),
            None => return QueryPlan::full_scan(predicates, has_or),
        },
        None => return QueryPlan::full_scan(predicates, has_or),
    };

    // Exact match strictly beats a range, even when both are present.
    if let Some(eq) = predicates
        .iter()
        .find(|p| p.column == pk_column && p.op == BinaryOp::Eq)
    {
        let lookup_key = eq.value.clone();
        return QueryPlan {
            access_method: AccessMethod::IndexLookup,
            index_column: Some(pk_column),
            lookup_key: Some(lookup_key),
            range_lower: None,
            range_upper: None,
            lower_inclusive: false,
            upper_inclusive: false,
            has_or,
            estimated_cost: 1,
            predicates,
        };
    }

    let lower = predicates
        .iter()
        .find(|p| p.column == pk_column && matches!(p.op, BinaryOp::Gt | BinaryOp::Ge));
    let upper = predicates
        .iter()
        .find(|p| p.column == pk_column && matches!(p.op, BinaryOp::Lt | BinaryOp::Le));

    if lower.is_some() || upper.is_some() {
        let lower_inclusive = matches!(lower.map(|p| p.op), Some(BinaryOp::Ge));
        let upper_inclusive = matches!(upper.map(|p| p.op), Some(BinaryOp::Le));
        return QueryPlan {
            access_method: AccessMethod::IndexRangeScan,
            index_column: Some(pk_column),
            lookup_key: None,
            range_lower: lower.map(|p| p.value.clone()),
            range_upper: upper.map(|p| p.value.clone()),
            lower_inclusive,
            upper_inclusive,
            has_or,
            estimated_cost: 10,
            predicates,
        };
    }

    QueryPlan::full_scan(predicates, has_or)
}

/// Walk the AND tree of a WHERE clause. An OR suppresses extraction in its
/// whole subtree.
fn collect_conjuncts(expr: &Expr, out: &mut Vec<Predicate>, has_or: &mut bool) {
    match expr {
        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => {
            collect_conjuncts(left, out, has_or);
            collect_conjuncts(right, out, has_or);
        }
        Expr::Binary {
            op: BinaryOp::Or, ..
        } => {
            *has_or = true;
            mark_or(expr, has_or);
        }
        Expr::Binary { op, left, right } if is_comparison(*op) => {
            // col OP literal, or literal OP col with the operator flipped.
            match (left.as_ref(), right.as_ref()) {
                (Expr::Identifier(column), Expr::Literal(value)) => out.push(Predicate {
                    column: column.clone(),
                    op: *op,
                    value: value.clone(),
                }),
                (Expr::Literal(value), Expr::Identifier(column)) => out.push(Predicate {
                    column: column.clone(),
                    op: flip(*op),
                    value: value.clone(),
                }),
                _ => {}
            }
        }
        _ => {}
    }
}

/// Note any nested ORs without extracting anything below them.
fn mark_or(expr: &Expr, has_or: &mut bool) {
    match expr {
        Expr::Binary { op, left, right } => {
            if *op == BinaryOp::Or {
                *has_or = true;
            }
            mark_or(left, has_or);
            mark_or(right, has_or);
        }
        Expr::Unary { expr, .. } => mark_or(expr, has_or),
        _ => {}
    }
}

fn is_comparison(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
    )
}

fn flip(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::Le => BinaryOp::Ge,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::Ge => BinaryOp::Le,
        other => other,
    }
}
