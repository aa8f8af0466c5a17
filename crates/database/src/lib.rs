//! Embedding facade: one database file behind a small synchronous API.
//!
//! A `Database` owns the whole engine. Statements are serialized through
//! `&mut self`; a multi-threaded host wraps the `Database` in the lock of
//! its choice (it is `Send`), which keeps exactly one lock in play.
//!
//! # Example
//!
//! ```no_run
//! use database::Database;
//! use common::Config;
//!
//! let mut db = Database::open("/tmp/app.db".as_ref(), &Config::default()).unwrap();
//! db.execute_sql("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)").unwrap();
//! db.execute_sql("INSERT INTO users (id, name) VALUES (1, 'Alice')").unwrap();
//! let results = db.execute_sql("SELECT * FROM users").unwrap();
//! assert_eq!(results[0].row_count, 1);
//! db.close().unwrap();
//! ```

use common::{Config, DbResult, QueryResult};
use executor::Executor;
use log::debug;
use parser::{parse_sql, SelectStatement, Statement};
use std::path::Path;
use table::Table;

pub use common::{DbError, PageId, Row, RowId};
pub use types::{SqlType, Value};

/// An open database file.
pub struct Database {
    executor: Executor,
}

impl Database {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path, config: &Config) -> DbResult<Self> {
        let executor = Executor::open(path, config)?;
        debug!("opened database at {}", path.display());
        Ok(Self { executor })
    }

    /// Parse a script of semicolon-separated statements and execute each
    /// in order, stopping at the first failure.
    pub fn execute_sql(&mut self, sql: &str) -> DbResult<Vec<QueryResult>> {
        let statements = parse_sql(sql)?;
        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            results.push(self.executor.execute(statement)?);
        }
        Ok(results)
    }

    /// Execute one already-parsed statement.
    pub fn execute(&mut self, statement: Statement) -> DbResult<QueryResult> {
        self.executor.execute(statement)
    }

    /// Plan a SELECT and return the rendered plan.
    pub fn explain(&mut self, statement: &SelectStatement) -> DbResult<QueryResult> {
        self.executor.explain(statement)
    }

    /// Make everything executed so far durable.
    pub fn flush(&mut self) -> DbResult<()> {
        self.executor.flush()
    }

    /// Flush and release the file.
    pub fn close(self) -> DbResult<()> {
        self.executor.close()
    }

    /// Names of all tables, sorted.
    pub fn get_tables(&self) -> Vec<String> {
        self.executor.get_tables()
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.executor.get_table(name)
    }
}
