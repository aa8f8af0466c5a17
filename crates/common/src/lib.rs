pub mod pretty;

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;
use types::{SqlType, Value};

/// Fixed page size in bytes; the unit of file I/O and cache management.
pub const PAGE_SIZE: usize = 4096;

/// Zero-based page identifier. Page `i` lives at file offset `i * PAGE_SIZE`.
///
/// Examples:
/// - `let catalog_start = PageId(0);`
/// - `let data_page = PageId(42);`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub u32);

/// Monotonic per-table row identifier, starting at 1.
pub type RowId = u64;

/// Physical address of a row: the page holding it and the offset (within the
/// page payload) of the row's 2-byte length prefix.
///
/// Packs into a u64 for storage as a B+-tree value: page id in the upper 32
/// bits, offset in the lower 32.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowLocation {
    pub page_id: PageId,
    pub offset: u32,
}

impl RowLocation {
    pub fn new(page_id: PageId, offset: u32) -> Self {
        Self { page_id, offset }
    }

    pub fn to_u64(self) -> u64 {
        (u64::from(self.page_id.0) << 32) | u64::from(self.offset)
    }

    pub fn from_u64(raw: u64) -> Self {
        Self {
            page_id: PageId((raw >> 32) as u32),
            offset: (raw & 0xFFFF_FFFF) as u32,
        }
    }
}

/// A materialized row: its id plus one value per schema column, in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(id: RowId, values: Vec<Value>) -> Self {
        Self { id, values }
    }
}

/// Result of executing one statement.
///
/// Either a rectangular row set (`columns` + `rows`, empty `message`) or a
/// DDL/DML outcome carried in `message` with no rows. `row_count` is the
/// number of returned rows for queries and the number of affected rows for
/// DML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    pub message: String,
}

impl QueryResult {
    pub fn rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            message: String::new(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            message: message.into(),
        }
    }

    pub fn affected(message: impl Into<String>, row_count: usize) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count,
            message: message.into(),
        }
    }
}

/// Canonical error type shared across the engine.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("table '{0}' not found")]
    TableNotFound(String),
    #[error("table '{0}' already exists")]
    TableAlreadyExists(String),
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
    #[error("type mismatch on column '{column}': expected {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: SqlType,
        found: SqlType,
    },
    #[error("column '{0}' is NOT NULL")]
    NotNullViolation(String),
    #[error("unique violation on index '{0}'")]
    UniqueViolation(String),
    #[error("expected {expected} values, got {found}")]
    ValueCountMismatch { expected: usize, found: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("corrupt page {page}: {reason}")]
    CorruptPage { page: u32, reason: String },
    #[error("corrupt record: {0}")]
    CorruptRecord(String),
    #[error("b+tree node of {size} bytes exceeds page capacity")]
    NodeOverflow { size: usize },
    #[error("page {page} out of range (page count {page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("index '{0}' already exists")]
    IndexExists(String),
    #[error("index '{0}' not found")]
    IndexNotFound(String),
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("catalog: {0}")]
    Catalog(String),
}

/// Result alias carrying a `DbError`.
pub type DbResult<T> = Result<T, DbError>;

/// Runtime configuration for opening a database file.
///
/// # Example
/// ```
/// use common::Config;
///
/// let config = Config::builder().cache_pages(256).build();
/// assert_eq!(config.cache_pages, 256);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct Config {
    /// Number of pages the buffer pool keeps resident.
    #[builder(default = 1000)]
    pub cache_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { cache_pages: 1000 }
    }
}

/// Convenient re-exports for downstream crates.
pub mod prelude {
    pub use crate::{Config, DbError, DbResult, PageId, QueryResult, Row, RowId, RowLocation};
    pub use types::{SqlType, Value};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_location_round_trip() {
        let loc = RowLocation::new(PageId(7), 1024);
        let packed = loc.to_u64();
        assert_eq!(packed, (7u64 << 32) | 1024);
        assert_eq!(RowLocation::from_u64(packed), loc);
    }

    #[test]
    fn row_location_extremes() {
        let loc = RowLocation::new(PageId(u32::MAX), u32::MAX);
        assert_eq!(RowLocation::from_u64(loc.to_u64()), loc);
        let zero = RowLocation::from_u64(0);
        assert_eq!(zero, RowLocation::new(PageId(0), 0));
    }

    #[test]
    fn query_result_constructors() {
        let r = QueryResult::rows(vec!["id".into()], vec![vec![Value::Integer(1)]]);
        assert_eq!(r.row_count, 1);
        assert!(r.message.is_empty());

        let m = QueryResult::affected("Updated 3 rows", 3);
        assert!(m.rows.is_empty());
        assert_eq!(m.row_count, 3);
        assert_eq!(m.message, "Updated 3 rows");
    }

    #[test]
    fn config_defaults() {
        assert_eq!(Config::default().cache_pages, 1000);
        assert_eq!(Config::builder().build().cache_pages, 1000);
    }
}
