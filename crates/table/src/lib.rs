//! The table layer: typed rows placed across data pages, a primary-key
//! B+-tree, and secondary index maintenance.

mod index;


pub use index::Index;

use btree::BTree;
use buffer::Pager;
use catalog::{IndexInfo, Schema, TableInfo};
use common::{DbError, DbResult, PageId, Row, RowId, RowLocation};
use hashbrown::HashMap;
use log::debug;
use storage::{decode_row, encode_row, row_id_key, value_key, PageType};
use types::Value;

/// One table: schema, primary index, data pages, and secondary indexes.
///
/// The primary-key tree maps the PK value's serialization (or the 8-byte
/// row id when the schema has no PK) to a packed [`RowLocation`]. A
/// duplicate PK silently overwrites the stored location; there is no
/// uniqueness check at this layer, and the superseded row bytes stay behind
/// in their data page.
#[derive(Debug)]
pub struct Table {
    name: String,
    schema: Schema,
    primary: BTree,
    next_row_id: RowId,
    data_page_ids: Vec<PageId>,
    indexes: HashMap<String, Index>,
}

impl Table {
    /// Create a brand-new table with an empty primary index.
    pub fn create(pager: &mut Pager, name: impl Into<String>, schema: Schema) -> DbResult<Self> {
        Ok(Self {
            name: name.into(),
            schema,
            primary: BTree::create(pager)?,
            next_row_id: 1,
            data_page_ids: Vec::new(),
            indexes: HashMap::new(),
        })
    }

    /// Reattach to a table described by the catalog. Rows are not loaded.
    pub fn open(info: &TableInfo) -> Self {
        let indexes = info
            .indexes
            .iter()
            .map(|idx| (idx.name.clone(), Index::open(idx)))
            .collect();
        Self {
            name: info.name.clone(),
            schema: info.schema.clone(),
            primary: BTree::open(info.root_page),
            next_row_id: info.next_row_id,
            data_page_ids: info.data_page_ids.clone(),
            indexes,
        }
    }

    /// Snapshot of the state the catalog persists.
    pub fn to_info(&self) -> TableInfo {
        TableInfo {
            name: self.name.clone(),
            schema: self.schema.clone(),
            root_page: self.primary.root(),
            next_row_id: self.next_row_id,
            data_page_ids: self.data_page_ids.clone(),
            indexes: self.index_infos(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn next_row_id(&self) -> RowId {
        self.next_row_id
    }

    pub fn index_infos(&self) -> Vec<IndexInfo> {
        let mut infos: Vec<IndexInfo> = self.indexes.values().map(Index::to_info).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    /// Validate and store one row, maintaining every index. Returns the
    /// assigned row id.
    pub fn insert_row(&mut self, pager: &mut Pager, values: Vec<Value>) -> DbResult<RowId> {
        if values.len() != self.schema.len() {
            return Err(DbError::ValueCountMismatch {
                expected: self.schema.len(),
                found: values.len(),
            });
        }
        for (column, value) in self.schema.columns().iter().zip(values.iter()) {
            match value.sql_type() {
                None => {
                    if column.not_null {
                        return Err(DbError::NotNullViolation(column.name.clone()));
                    }
                }
                Some(found) => {
                    if found != column.ty {
                        return Err(DbError::TypeMismatch {
                            column: column.name.clone(),
                            expected: column.ty,
                            found,
                        });
                    }
                }
            }
        }

        let row_id = self.next_row_id;
        self.next_row_id += 1;
        let row = Row::new(row_id, values);

        let bytes = encode_row(&row)?;
        let loc = self.place_row(pager, &bytes)?;

        let key = self.primary_key_bytes(&row)?;
        self.primary.insert(pager, &key, loc.to_u64())?;

        for index in self.indexes.values_mut() {
            index.insert(pager, &self.schema, &row, loc)?;
        }

        debug!("table '{}': inserted row {row_id}", self.name);
        Ok(row_id)
    }

    /// All rows, in data-page order.
    pub fn scan(&self, pager: &mut Pager) -> DbResult<Vec<Row>> {
        let mut rows = Vec::new();
        self.walk_rows(pager, |_, row| {
            rows.push(row);
            Ok(true)
        })?;
        Ok(rows)
    }

    /// Rows satisfying `filter`, stopping early once `limit` matches are
    /// collected (0 = unbounded).
    pub fn scan_with_filter(
        &self,
        pager: &mut Pager,
        mut filter: impl FnMut(&Row) -> DbResult<bool>,
        limit: usize,
    ) -> DbResult<Vec<Row>> {
        let mut rows = Vec::new();
        self.walk_rows(pager, |_, row| {
            if filter(&row)? {
                rows.push(row);
                if limit != 0 && rows.len() >= limit {
                    return Ok(false);
                }
            }
            Ok(true)
        })?;
        Ok(rows)
    }

    /// Point lookup through the primary-key tree.
    pub fn lookup_pk(&self, pager: &mut Pager, value: &Value) -> DbResult<Option<Row>> {
        let key = match self.schema.primary_key_index() {
            Some(_) => value_key(value)?,
            None => match value {
                Value::Integer(id) if *id >= 0 => row_id_key(*id as u64),
                _ => return Ok(None),
            },
        };
        match self.primary.search(pager, &key)? {
            Some(raw) => {
                let row = self.row_at(pager, RowLocation::from_u64(raw))?;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    /// Fetch the row stored at a known location.
    pub fn row_at(&self, pager: &mut Pager, loc: RowLocation) -> DbResult<Row> {
        let page = pager.get_page(loc.page_id)?;
        let record = page.record_at(loc.offset)?;
        decode_row(record)
    }

    /// Count rows matching `filter` and hand each to `apply` as an
    /// in-memory copy. Nothing is written back and no index is touched;
    /// the count is the contract.
    pub fn update_where(
        &self,
        pager: &mut Pager,
        mut filter: impl FnMut(&Row) -> DbResult<bool>,
        mut apply: impl FnMut(&mut Row) -> DbResult<()>,
    ) -> DbResult<usize> {
        let mut count = 0usize;
        self.walk_rows(pager, |_, mut row| {
            if filter(&row)? {
                apply(&mut row)?;
                count += 1;
            }
            Ok(true)
        })?;
        Ok(count)
    }

    /// Count rows matching `filter`. Rows are not removed from pages or
    /// indexes; reclamation is out of scope.
    pub fn delete_where(
        &self,
        pager: &mut Pager,
        mut filter: impl FnMut(&Row) -> DbResult<bool>,
    ) -> DbResult<usize> {
        let mut count = 0usize;
        self.walk_rows(pager, |_, row| {
            if filter(&row)? {
                count += 1;
            }
            Ok(true)
        })?;
        Ok(count)
    }

    /// Create a secondary index and backfill it from existing rows.
    pub fn create_index(
        &mut self,
        pager: &mut Pager,
        name: &str,
        columns: Vec<String>,
        unique: bool,
    ) -> DbResult<()> {
        if self.indexes.contains_key(name) {
            return Err(DbError::IndexExists(name.to_string()));
        }
        for column in &columns {
            if self.schema.column_index(column).is_none() {
                return Err(DbError::ColumnNotFound(column.clone()));
            }
        }

        let mut index = Index::create(pager, name, columns, unique)?;

        let mut entries = Vec::new();
        self.walk_rows(pager, |loc, row| {
            entries.push((loc, row));
            Ok(true)
        })?;
        for (loc, row) in entries {
            index.insert(pager, &self.schema, &row, loc)?;
        }

        debug!("table '{}': created index '{name}'", self.name);
        self.indexes.insert(name.to_string(), index);
        Ok(())
    }

    /// Forget a secondary index. Its tree pages leak, like dropped tables.
    pub fn drop_index(&mut self, name: &str) -> DbResult<()> {
        self.indexes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DbError::IndexNotFound(name.to_string()))
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    /// Visit every row with its location; the callback returns `false` to
    /// stop the walk.
    fn walk_rows(
        &self,
        pager: &mut Pager,
        mut visit: impl FnMut(RowLocation, Row) -> DbResult<bool>,
    ) -> DbResult<()> {
        for &page_id in &self.data_page_ids {
            // Decode the page's records up front so the page borrow ends
            // before the callback can touch the pager again.
            let entries: Vec<(u32, Vec<u8>)> = {
                let page = pager.get_page(page_id)?;
                let mut entries = Vec::with_capacity(page.num_slots() as usize);
                for record in page.records() {
                    let (offset, bytes) = record?;
                    entries.push((offset, bytes.to_vec()));
                }
                entries
            };
            for (offset, bytes) in entries {
                let row = decode_row(&bytes)?;
                if !visit(RowLocation::new(page_id, offset), row)? {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn primary_key_bytes(&self, row: &Row) -> DbResult<Vec<u8>> {
        match self.schema.primary_key_index() {
            Some(pk) => value_key(&row.values[pk]),
            None => Ok(row_id_key(row.id)),
        }
    }

    /// First-fit placement: reuse the first data page with room for the
    /// record plus its 2-byte length prefix, else allocate a fresh page.
    fn place_row(&mut self, pager: &mut Pager, bytes: &[u8]) -> DbResult<RowLocation> {
        if bytes.len() + 2 > storage::PAGE_PAYLOAD_SIZE {
            return Err(DbError::CorruptRecord(format!(
                "row of {} bytes cannot fit in one page",
                bytes.len()
            )));
        }
        for &page_id in &self.data_page_ids {
            let free = pager.get_page(page_id)?.free_space();
            if free >= bytes.len() + 2 {
                let offset = pager.get_page_mut(page_id)?.append_record(bytes)?;
                return Ok(RowLocation::new(page_id, u32::from(offset)));
            }
        }

        let page_id = pager.allocate_page(PageType::Data)?;
        self.data_page_ids.push(page_id);
        let offset = pager.get_page_mut(page_id)?.append_record(bytes)?;
        Ok(RowLocation::new(page_id, u32::from(offset)))
    }
}
