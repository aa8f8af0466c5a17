//! SELECT pipeline: fetch per the plan, filter, sort, clamp, project.

use crate::sort::{compare_rows, top_k, SortKey};
use crate::Executor;
use common::{DbError, DbResult, QueryResult, Row};
use expr::{EvalContext, Expr};
use parser::SelectStatement;
use planner::AccessMethod;

/// One resolved projection item.
enum Projection {
    /// A named table column at an ordinal.
    Column(usize),
    /// Any non-identifier expression: a synthetic "expr" column of NULLs.
    Synthetic,
}

impl Executor {
    pub(crate) fn select(&mut self, stmt: &SelectStatement) -> DbResult<QueryResult> {
        let table_name = stmt.table.to_lowercase();
        let table = self
            .tables
            .get(&table_name)
            .ok_or_else(|| DbError::TableNotFound(table_name.clone()))?;

        let schema = table.schema();
        let columns = schema.column_names();
        let plan = planner::plan_select(stmt, schema);
        let ctx = EvalContext::new(&columns);

        // Fetch candidate rows.
        let mut rows = match plan.access_method {
            AccessMethod::IndexLookup => {
                let mut rows = Vec::new();
                if let Some(key) = &plan.lookup_key {
                    if let Some(row) = table.lookup_pk(&mut self.pager, key)? {
                        // The probe found the key; the row must still pass
                        // the whole WHERE clause.
                        let keep = match &stmt.selection {
                            Some(predicate) => ctx.matches(predicate, &row)?,
                            None => true,
                        };
                        if keep {
                            rows.push(row);
                        }
                    }
                }
                rows
            }
            // Range plans fall back to a full scan: tree keys compare
            // bytewise, and little-endian integer keys do not sort
            // numerically.
            AccessMethod::IndexRangeScan | AccessMethod::FullTableScan => {
                let scan_limit = effective_limit(stmt).filter(|_| stmt.order_by.is_empty());
                table.scan_with_filter(
                    &mut self.pager,
                    |row| match &stmt.selection {
                        Some(predicate) => ctx.matches(predicate, row),
                        None => Ok(true),
                    },
                    scan_limit.unwrap_or(0),
                )?
            }
        };

        // Sort before projection so ORDER BY can reference any table
        // column, projected or not.
        if !stmt.order_by.is_empty() {
            let mut keys = Vec::with_capacity(stmt.order_by.len());
            for order in &stmt.order_by {
                let ordinal = schema
                    .column_index(&order.column)
                    .ok_or_else(|| DbError::ColumnNotFound(order.column.clone()))?;
                keys.push(SortKey {
                    ordinal,
                    descending: order.descending,
                });
            }

            match effective_limit(stmt) {
                Some(k) if k < rows.len() => {
                    rows = top_k(rows, k, &keys);
                }
                _ => rows.sort_by(|a, b| compare_rows(a, b, &keys)),
            }
        }

        // OFFSET then LIMIT, both clamped.
        let offset = stmt.offset.unwrap_or(0) as usize;
        let offset = offset.min(rows.len());
        rows.drain(..offset);
        if let Some(limit) = stmt.limit {
            rows.truncate(limit as usize);
        }

        self.project(stmt, &columns, rows)
    }

    fn project(
        &self,
        stmt: &SelectStatement,
        columns: &[String],
        rows: Vec<Row>,
    ) -> DbResult<QueryResult> {
        // `SELECT *` alone returns every column unchanged.
        if stmt.projection.len() == 1 && stmt.projection[0] == Expr::Star {
            let out = rows.into_iter().map(|row| row.values).collect();
            return Ok(QueryResult::rows(columns.to_vec(), out));
        }

        let mut names = Vec::new();
        let mut items = Vec::new();
        for expr in &stmt.projection {
            match expr {
                Expr::Identifier(name) => {
                    let ordinal = columns
                        .iter()
                        .position(|c| c == name)
                        .ok_or_else(|| DbError::ColumnNotFound(name.clone()))?;
                    names.push(name.clone());
                    items.push(Projection::Column(ordinal));
                }
                Expr::Star => {
                    for (ordinal, name) in columns.iter().enumerate() {
                        names.push(name.clone());
                        items.push(Projection::Column(ordinal));
                    }
                }
                _ => {
                    names.push("expr".to_string());
                    items.push(Projection::Synthetic);
                }
            }
        }

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = Vec::with_capacity(items.len());
            for item in &items {
                match item {
                    Projection::Column(ordinal) => {
                        values.push(row.values.get(*ordinal).cloned().unwrap_or(types::Value::Null))
                    }
                    Projection::Synthetic => values.push(types::Value::Null),
                }
            }
            out.push(values);
        }

        Ok(QueryResult::rows(names, out))
    }
}

/// LIMIT + OFFSET when a LIMIT is present; rows past this count can never
/// be returned.
fn effective_limit(stmt: &SelectStatement) -> Option<usize> {
    stmt.limit
        .map(|limit| (limit + stmt.offset.unwrap_or(0)) as usize)
}
