//! Secondary indexes: one B+-tree per index, keyed by the serialized value
//! of the indexed columns.

use btree::{BTree, RangeOptions};
use buffer::Pager;
use catalog::{IndexInfo, Schema};
use common::{DbError, DbResult, Row, RowLocation};
use storage::encode_value;
use types::Value;

/// A named secondary index over one or more columns.
///
/// Unique indexes key entries by the column serialization alone and reject
/// duplicates. Non-unique indexes append the 8-byte big-endian row location
/// to the key, which keeps entries distinct while preserving the sort order
/// of the column bytes; lookups then prefix-scan.
#[derive(Debug)]
pub struct Index {
    name: String,
    columns: Vec<String>,
    unique: bool,
    tree: BTree,
}

impl Index {
    pub fn create(
        pager: &mut Pager,
        name: impl Into<String>,
        columns: Vec<String>,
        unique: bool,
    ) -> DbResult<Self> {
        Ok(Self {
            name: name.into(),
            columns,
            unique,
            tree: BTree::create(pager)?,
        })
    }

    pub fn open(info: &IndexInfo) -> Self {
        Self {
            name: info.name.clone(),
            columns: info.columns.clone(),
            unique: info.unique,
            tree: BTree::open(info.root_page),
        }
    }

    pub fn to_info(&self) -> IndexInfo {
        IndexInfo {
            name: self.name.clone(),
            columns: self.columns.clone(),
            unique: self.unique,
            root_page: self.tree.root(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Serialized key of the indexed columns for `row`.
    fn column_key(&self, schema: &Schema, row: &Row) -> DbResult<Vec<u8>> {
        let mut key = Vec::new();
        for column in &self.columns {
            let ordinal = schema
                .column_index(column)
                .ok_or_else(|| DbError::ColumnNotFound(column.clone()))?;
            encode_value(&row.values[ordinal], &mut key)?;
        }
        Ok(key)
    }

    /// Register `row` at `loc`.
    pub fn insert(
        &mut self,
        pager: &mut Pager,
        schema: &Schema,
        row: &Row,
        loc: RowLocation,
    ) -> DbResult<()> {
        let mut key = self.column_key(schema, row)?;
        if self.unique {
            if self.tree.search(pager, &key)?.is_some() {
                return Err(DbError::UniqueViolation(self.name.clone()));
            }
        } else {
            key.extend_from_slice(&loc.to_u64().to_be_bytes());
        }
        self.tree.insert(pager, &key, loc.to_u64())
    }

    /// Locations of every row whose indexed columns equal `values`.
    pub fn lookup(&self, pager: &mut Pager, values: &[Value]) -> DbResult<Vec<RowLocation>> {
        let mut prefix = Vec::new();
        for value in values {
            encode_value(value, &mut prefix)?;
        }

        if self.unique {
            return Ok(self
                .tree
                .search(pager, &prefix)?
                .map(RowLocation::from_u64)
                .into_iter()
                .collect());
        }

        let upper = increment_prefix(&prefix);
        let entries = self.tree.scan_range(
            pager,
            Some(&prefix),
            upper.as_deref(),
            RangeOptions {
                start_inclusive: true,
                end_inclusive: false,
                limit: 0,
            },
        )?;

        Ok(entries
            .into_iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, raw)| RowLocation::from_u64(raw))
            .collect())
    }
}

/// Smallest byte string greater than every string starting with `prefix`:
/// increment the rightmost non-0xFF byte and truncate. All-0xFF prefixes
/// have no upper bound.
fn increment_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.last().copied() {
        if last == 0xFF {
            upper.pop();
        } else {
            let end = upper.len() - 1;
            upper[end] = last + 1;
            return Some(upper);
        }
    }
    None
}
