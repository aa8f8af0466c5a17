//! Persistent table metadata.
//!
//! The catalog owns the name → [`TableInfo`] map and persists it into a
//! fixed metadata region: the first [`CATALOG_PAGES`] pages of the database
//! file, reserved when the file is created. Tables are described (schema,
//! index roots, data pages, row-id watermark) but their rows are never
//! loaded here.

use ahash::RandomState;
use bincode::config;
use bincode::serde::{decode_from_slice, encode_to_vec};
use buffer::Pager;
use common::{DbError, DbResult, PageId, RowId};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use storage::{PageType, PAGE_PAYLOAD_SIZE};
use types::SqlType;

type Map<K, V> = HashMap<K, V, RandomState>;

/// Pages reserved at the front of the file for catalog metadata.
pub const CATALOG_PAGES: u32 = 8;

/// Largest record one region page can hold.
const PAGE_CHUNK: usize = PAGE_PAYLOAD_SIZE - 2;

/// One column of a table schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: SqlType,
    pub primary_key: bool,
    pub not_null: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary_key: false,
            not_null: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }
}

/// Ordered column layout plus lookup structures rebuilt after load.
///
/// Column names are case-sensitive here; lowercasing table names is the
/// executor's business and stops at the schema boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
    #[serde(skip)]
    name_to_ordinal: Map<String, usize>,
    #[serde(skip)]
    primary_key: Option<usize>,
}

impl Schema {
    pub fn try_new(columns: Vec<Column>) -> DbResult<Self> {
        if columns.is_empty() {
            return Err(DbError::Catalog(
                "table must contain at least one column".into(),
            ));
        }
        if columns.len() > u16::MAX as usize {
            return Err(DbError::Catalog("too many columns for a single table".into()));
        }
        let mut schema = Self {
            columns,
            name_to_ordinal: Map::default(),
            primary_key: None,
        };
        schema.rebuild()?;
        Ok(schema)
    }

    /// Recompute the lookup map and PK ordinal; called after deserialization.
    fn rebuild(&mut self) -> DbResult<()> {
        self.name_to_ordinal.clear();
        self.primary_key = None;
        for (idx, column) in self.columns.iter().enumerate() {
            if self
                .name_to_ordinal
                .insert(column.name.clone(), idx)
                .is_some()
            {
                return Err(DbError::Catalog(format!(
                    "duplicate column '{}' in schema",
                    column.name
                )));
            }
            if column.primary_key {
                if self.primary_key.is_some() {
                    return Err(DbError::Catalog(
                        "at most one primary key column is supported".into(),
                    ));
                }
                self.primary_key = Some(idx);
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.name_to_ordinal.get(name).copied()
    }

    pub fn column(&self, ordinal: usize) -> Option<&Column> {
        self.columns.get(ordinal)
    }

    pub fn primary_key_index(&self) -> Option<usize> {
        self.primary_key
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// A secondary index registered on a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub root_page: PageId,
}

/// Everything the engine must remember about one table between opens.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub schema: Schema,
    /// Root page of the primary-key B+-tree.
    pub root_page: PageId,
    /// Next row id to hand out; persisted so ids are never reissued.
    pub next_row_id: RowId,
    /// Data pages in allocation order.
    pub data_page_ids: Vec<PageId>,
    pub indexes: Vec<IndexInfo>,
}

/// The authority on which tables exist.
#[derive(Debug)]
pub struct Catalog {
    tables: Map<String, TableInfo>,
}

impl Catalog {
    fn empty() -> Self {
        Self {
            tables: Map::default(),
        }
    }

    /// Open the catalog from the metadata region, initializing the region
    /// in a fresh file.
    pub fn open(pager: &mut Pager) -> DbResult<Self> {
        if pager.page_count() == 0 {
            let catalog = Self::empty();
            for _ in 0..CATALOG_PAGES {
                pager.allocate_page(PageType::Data)?;
            }
            catalog.flush(pager)?;
            return Ok(catalog);
        }

        if pager.page_count() < CATALOG_PAGES {
            return Err(DbError::Catalog(format!(
                "file has {} pages, metadata region needs {}",
                pager.page_count(),
                CATALOG_PAGES
            )));
        }

        let mut blob = Vec::new();
        for id in 0..CATALOG_PAGES {
            let page = pager.get_page(PageId(id))?;
            if page.num_slots() > 0 {
                blob.extend_from_slice(page.record_at(0)?);
            }
        }

        let (mut tables, _): (Map<String, TableInfo>, usize) =
            decode_from_slice(&blob, config::legacy())
                .map_err(|e| DbError::Catalog(format!("invalid metadata region: {e}")))?;
        for info in tables.values_mut() {
            info.schema.rebuild()?;
        }
        Ok(Self { tables })
    }

    /// Serialize the map and rewrite the metadata region through the pager.
    pub fn flush(&self, pager: &mut Pager) -> DbResult<()> {
        let blob = encode_to_vec(&self.tables, config::legacy())
            .map_err(|e| DbError::Catalog(format!("serialize failed: {e}")))?;

        if blob.len() > PAGE_CHUNK * CATALOG_PAGES as usize {
            return Err(DbError::Catalog(format!(
                "metadata region full: {} bytes of table metadata",
                blob.len()
            )));
        }

        let mut rest = blob.as_slice();
        for id in 0..CATALOG_PAGES {
            let take = rest.len().min(PAGE_CHUNK);
            let (chunk, tail) = rest.split_at(take);
            rest = tail;

            let page = pager.get_page_mut(PageId(id))?;
            page.reset(PageType::Data);
            page.append_record(chunk)?;
        }
        Ok(())
    }

    /// Record a freshly created table.
    pub fn add_table(&mut self, info: TableInfo) -> DbResult<()> {
        if self.tables.contains_key(&info.name) {
            return Err(DbError::TableAlreadyExists(info.name.clone()));
        }
        self.tables.insert(info.name.clone(), info);
        Ok(())
    }

    /// Unlink a table. Its tree and data pages stay behind in the file as
    /// unreachable storage.
    pub fn remove_table(&mut self, name: &str) -> DbResult<TableInfo> {
        self.tables
            .remove(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&TableInfo> {
        self.tables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TableInfo> {
        self.tables.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableInfo> {
        self.tables.values()
    }
}
