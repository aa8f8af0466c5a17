//! ORDER BY / LIMIT / OFFSET, planner visibility, and larger scans.

use common::Config;
use database::{Database, Value};
use tempfile::TempDir;

fn open_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("app.db"), &Config::default()).unwrap();
    (db, dir)
}

#[test]
fn order_by_limit_returns_largest_values() {
    let (mut db, _dir) = open_db();
    db.execute_sql("CREATE TABLE t (id INTEGER PRIMARY KEY, val INTEGER)")
        .unwrap();

    // Deterministic shuffle of 0..10000.
    for i in 0..10_000 {
        db.execute_sql(&format!("INSERT INTO t VALUES ({i}, {})", (i * 7919) % 10_000))
            .unwrap();
    }

    let results = db
        .execute_sql("SELECT val FROM t ORDER BY val DESC LIMIT 10")
        .unwrap();
    let got: Vec<&Value> = results[0].rows.iter().map(|r| &r[0]).collect();
    let want: Vec<Value> = (9990..10_000).rev().map(Value::Integer).collect();
    assert_eq!(got, want.iter().collect::<Vec<_>>());
}

#[test]
fn order_by_ascending_with_offset() {
    let (mut db, _dir) = open_db();
    db.execute_sql("CREATE TABLE t (id INTEGER PRIMARY KEY)").unwrap();
    for i in (1..=20).rev() {
        db.execute_sql(&format!("INSERT INTO t VALUES ({i})")).unwrap();
    }

    let results = db
        .execute_sql("SELECT id FROM t ORDER BY id LIMIT 3 OFFSET 5")
        .unwrap();
    assert_eq!(
        results[0].rows,
        vec![
            vec![Value::Integer(6)],
            vec![Value::Integer(7)],
            vec![Value::Integer(8)],
        ]
    );
}

#[test]
fn nulls_sort_first() {
    let (mut db, _dir) = open_db();
    db.execute_sql(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, x INTEGER); \
         INSERT INTO t VALUES (1, 5); \
         INSERT INTO t (id) VALUES (2); \
         INSERT INTO t VALUES (3, 1)",
    )
    .unwrap();

    let results = db.execute_sql("SELECT id FROM t ORDER BY x").unwrap();
    assert_eq!(
        results[0].rows,
        vec![
            vec![Value::Integer(2)],
            vec![Value::Integer(3)],
            vec![Value::Integer(1)],
        ]
    );
}

#[test]
fn explain_shows_the_chosen_access_method() {
    let (mut db, _dir) = open_db();
    db.execute_sql("CREATE TABLE t (id INTEGER PRIMARY KEY, val INTEGER)")
        .unwrap();

    let results = db
        .execute_sql("EXPLAIN SELECT * FROM t WHERE id = 3")
        .unwrap();
    assert_eq!(results[0].columns, vec!["Property", "Value"]);
    assert_eq!(results[0].rows[1][1], Value::Text("IndexLookup".into()));
    assert_eq!(results[0].rows[2][1], Value::Text("1".into()));

    let results = db
        .execute_sql("EXPLAIN SELECT * FROM t WHERE id = 3 OR val = 1")
        .unwrap();
    assert_eq!(results[0].rows[1][1], Value::Text("FullTableScan".into()));
    assert_eq!(results[0].rows[2][1], Value::Text("100".into()));
}

#[test]
fn boolean_and_real_columns() {
    let (mut db, _dir) = open_db();
    db.execute_sql(
        "CREATE TABLE m (id INTEGER PRIMARY KEY, ok BOOLEAN, score REAL); \
         INSERT INTO m VALUES (1, TRUE, 1.5); \
         INSERT INTO m VALUES (2, FALSE, -0.5)",
    )
    .unwrap();

    let results = db.execute_sql("SELECT id FROM m WHERE ok = TRUE").unwrap();
    assert_eq!(results[0].rows, vec![vec![Value::Integer(1)]]);

    let results = db
        .execute_sql("SELECT id FROM m WHERE score < 0.0")
        .unwrap();
    assert_eq!(results[0].rows, vec![vec![Value::Integer(2)]]);
}

#[test]
fn where_with_arithmetic_and_concat() {
    let (mut db, _dir) = open_db();
    db.execute_sql(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, a INTEGER, b TEXT); \
         INSERT INTO t VALUES (1, 4, 'foo'); \
         INSERT INTO t VALUES (2, 5, 'bar')",
    )
    .unwrap();

    let results = db
        .execute_sql("SELECT id FROM t WHERE a * 2 = 10")
        .unwrap();
    assert_eq!(results[0].rows, vec![vec![Value::Integer(2)]]);

    let results = db
        .execute_sql("SELECT id FROM t WHERE b + 'x' = 'foox'")
        .unwrap();
    assert_eq!(results[0].rows, vec![vec![Value::Integer(1)]]);
}

#[test]
fn scans_spanning_many_pages() {
    let (mut db, _dir) = open_db();
    db.execute_sql("CREATE TABLE t (id INTEGER PRIMARY KEY, pad TEXT)")
        .unwrap();

    let pad = "x".repeat(900);
    for i in 1..=50 {
        db.execute_sql(&format!("INSERT INTO t VALUES ({i}, '{pad}')"))
            .unwrap();
    }

    let results = db.execute_sql("SELECT * FROM t WHERE id > 40").unwrap();
    assert_eq!(results[0].row_count, 10);

    let results = db.execute_sql("SELECT * FROM t").unwrap();
    assert_eq!(results[0].row_count, 50);
}
