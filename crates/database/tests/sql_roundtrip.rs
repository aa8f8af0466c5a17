//! End-to-end statement execution through the facade.

use common::Config;
use database::{Database, DbError, Value};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn open_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("app.db"), &Config::default()).unwrap();
    (db, dir)
}

#[test]
fn create_insert_select_in_one_script() {
    let (mut db, _dir) = open_db();

    let results = db
        .execute_sql(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT); \
             INSERT INTO users (id, name) VALUES (1, 'Alice'); \
             SELECT * FROM users",
        )
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].message, "Table 'users' created");
    assert_eq!(results[1].message, "Inserted 1 row (id=1)");

    let select = &results[2];
    assert_eq!(select.columns, vec!["id", "name"]);
    assert_eq!(
        select.rows,
        vec![vec![Value::Integer(1), Value::Text("Alice".into())]]
    );
    assert_eq!(select.row_count, 1);
}

#[test]
fn script_stops_at_first_failure() {
    let (mut db, _dir) = open_db();
    db.execute_sql("CREATE TABLE t (id INTEGER)").unwrap();

    let err = db
        .execute_sql("INSERT INTO t VALUES (1); INSERT INTO missing VALUES (2)")
        .unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)));

    // The first statement of the failed script still ran.
    let results = db.execute_sql("SELECT * FROM t").unwrap();
    assert_eq!(results[0].row_count, 1);
}

#[test]
fn parse_errors_are_bundled() {
    let (mut db, _dir) = open_db();
    let err = db.execute_sql("SELEC * FROM t; DELETE t").unwrap_err();
    let DbError::Parse(message) = err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert!(message.contains("; "));
}

#[test]
fn is_null_is_a_parse_error() {
    let (mut db, _dir) = open_db();
    db.execute_sql("CREATE TABLE t (x INTEGER)").unwrap();
    assert!(matches!(
        db.execute_sql("SELECT * FROM t WHERE x IS NULL").unwrap_err(),
        DbError::Parse(_)
    ));
}

#[test]
fn null_comparison_matches_no_rows() {
    let (mut db, _dir) = open_db();
    db.execute_sql(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, x INTEGER); \
         INSERT INTO t (id) VALUES (1)",
    )
    .unwrap();

    let results = db.execute_sql("SELECT * FROM t WHERE x = NULL").unwrap();
    assert_eq!(results[0].row_count, 0);
}

#[test]
fn text_escapes_survive_storage() {
    let (mut db, _dir) = open_db();
    let results = db
        .execute_sql(
            "CREATE TABLE q (id INTEGER PRIMARY KEY, quote TEXT); \
             INSERT INTO q VALUES (1, 'it''s a test'); \
             SELECT quote FROM q",
        )
        .unwrap();
    assert_eq!(
        results[2].rows,
        vec![vec![Value::Text("it's a test".into())]]
    );
}

#[test]
fn get_tables_and_get_table() {
    let (mut db, _dir) = open_db();
    db.execute_sql("CREATE TABLE b (id INTEGER); CREATE TABLE a (id INTEGER)")
        .unwrap();

    assert_eq!(db.get_tables(), vec!["a", "b"]);
    assert!(db.get_table("a").is_some());
    assert!(db.get_table("A").is_some());
    assert!(db.get_table("missing").is_none());
}
