use crate::{QueryResult, RowLocation};
use tabled::{builder::Builder, settings, Table};
use types::Value;

/// Predefined output styles that map to `tabled` styles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TableStyleKind {
    #[default]
    Rounded,
    Ascii,
    Plain,
}

impl TableStyleKind {
    fn apply(self, table: &mut Table) {
        match self {
            Self::Rounded => table.with(settings::Style::rounded()),
            Self::Ascii => table.with(settings::Style::ascii()),
            Self::Plain => table.with(settings::Style::empty()),
        };
    }
}

/// Render a statement result into a human-friendly string.
///
/// Message results render as the bare message; row results render as a
/// table with a trailing row count.
pub fn render_query_result(result: &QueryResult, style: TableStyleKind) -> String {
    if !result.message.is_empty() {
        return result.message.clone();
    }
    if result.columns.is_empty() && result.rows.is_empty() {
        return "<empty>".into();
    }

    let mut builder = Builder::default();
    builder.push_record(result.columns.iter().cloned());
    for row in &result.rows {
        builder.push_record(row.iter().map(format_value));
    }

    let mut table = builder.build();
    style.apply(&mut table);
    format!("{table}\n({} rows)", result.row_count)
}

/// Format a full row into a comma-separated string.
pub fn format_row(values: &[Value]) -> String {
    values
        .iter()
        .map(format_value)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a single value for display. Text is quoted so empty strings and
/// NULL stay distinguishable.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Integer(v) => v.to_string(),
        Value::Real(v) => v.to_string(),
        Value::Text(text) => format!("'{text}'"),
        Value::Boolean(b) => b.to_string(),
        Value::Null => "NULL".into(),
    }
}

/// Format a packed row location as `(page_id, offset)`.
pub fn format_row_location(loc: &RowLocation) -> String {
    format!("({}, {})", loc.page_id.0, loc.offset)
}
