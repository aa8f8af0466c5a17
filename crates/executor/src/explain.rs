//! EXPLAIN output: a query plan rendered as {Property, Value} rows.

use common::QueryResult;
use planner::{AccessMethod, QueryPlan};
use types::Value;

pub(crate) fn render(table: &str, plan: &QueryPlan) -> QueryResult {
    let mut rows = vec![
        property("Query Plan", format!("SELECT on table '{table}'")),
        property("Access Method", plan.access_method.name().to_string()),
        property("Estimated Cost", plan.estimated_cost.to_string()),
    ];

    match plan.access_method {
        AccessMethod::IndexLookup => {
            if let (Some(column), Some(key)) = (&plan.index_column, &plan.lookup_key) {
                rows.push(property("Lookup", format!("{column} = {key}")));
            }
        }
        AccessMethod::IndexRangeScan => {
            if let Some(column) = &plan.index_column {
                rows.push(property("Range", describe_range(column, plan)));
            }
        }
        AccessMethod::FullTableScan => {}
    }

    if !plan.predicates.is_empty() {
        rows.push(property("Predicates", plan.predicates.len().to_string()));
        for (i, predicate) in plan.predicates.iter().enumerate() {
            rows.push(property(
                &format!("  Predicate {}", i + 1),
                format!("{} {} {}", predicate.column, predicate.op, predicate.value),
            ));
        }
    }

    QueryResult::rows(vec!["Property".into(), "Value".into()], rows)
}

fn property(name: &str, value: String) -> Vec<Value> {
    vec![Value::Text(name.to_string()), Value::Text(value)]
}

fn describe_range(column: &str, plan: &QueryPlan) -> String {
    let lower = plan
        .range_lower
        .as_ref()
        .map(|v| {
            let op = if plan.lower_inclusive { ">=" } else { ">" };
            format!("{column} {op} {v}")
        })
        .unwrap_or_default();
    let upper = plan
        .range_upper
        .as_ref()
        .map(|v| {
            let op = if plan.upper_inclusive { "<=" } else { "<" };
            format!("{column} {op} {v}")
        })
        .unwrap_or_default();

    match (lower.is_empty(), upper.is_empty()) {
        (false, false) => format!("{lower} AND {upper}"),
        (false, true) => lower,
        (true, false) => upper,
        (true, true) => String::new(),
    }
}
