use super::*;
use expr::{BinaryOp, Expr, UnaryOp};
use pretty_assertions::assert_eq;
use types::{SqlType, Value};

fn select(sql: &str) -> SelectStatement {
    match parse_statement(sql).unwrap() {
        Statement::Select(stmt) => stmt,
        other => panic!("expected SELECT, got {other:?}"),
    }
}

fn ident(name: &str) -> Expr {
    Expr::Identifier(name.into())
}

fn int(v: i64) -> Expr {
    Expr::Literal(Value::Integer(v))
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[test]
fn create_table_with_constraints() {
    let stmt = parse_statement(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL, ok BOOLEAN)",
    )
    .unwrap();

    assert_eq!(
        stmt,
        Statement::CreateTable {
            name: "users".into(),
            columns: vec![
                ColumnDef {
                    name: "id".into(),
                    ty: SqlType::Integer,
                    primary_key: true,
                    not_null: false,
                },
                ColumnDef {
                    name: "name".into(),
                    ty: SqlType::Text,
                    primary_key: false,
                    not_null: true,
                },
                ColumnDef {
                    name: "score".into(),
                    ty: SqlType::Real,
                    primary_key: false,
                    not_null: false,
                },
                ColumnDef {
                    name: "ok".into(),
                    ty: SqlType::Boolean,
                    primary_key: false,
                    not_null: false,
                },
            ],
        }
    );
}

#[test]
fn type_synonyms_are_accepted() {
    let stmt = parse_statement(
        "CREATE TABLE t (a INT, b FLOAT, c DOUBLE, d VARCHAR(32), e STRING, f BOOL)",
    )
    .unwrap();
    let Statement::CreateTable { columns, .. } = stmt else {
        panic!("expected CREATE TABLE");
    };
    let types: Vec<SqlType> = columns.into_iter().map(|c| c.ty).collect();
    assert_eq!(
        types,
        vec![
            SqlType::Integer,
            SqlType::Real,
            SqlType::Real,
            SqlType::Text,
            SqlType::Text,
            SqlType::Boolean,
        ]
    );
}

#[test]
fn keywords_are_case_insensitive() {
    let stmt = parse_statement("select * from users where id = 1").unwrap();
    assert!(matches!(stmt, Statement::Select(_)));
}

#[test]
fn insert_with_and_without_column_list() {
    let stmt = parse_statement("INSERT INTO users (id, name) VALUES (1, 'Alice')").unwrap();
    assert_eq!(
        stmt,
        Statement::Insert(InsertStatement {
            table: "users".into(),
            columns: Some(vec!["id".into(), "name".into()]),
            values: vec![int(1), Expr::Literal(Value::Text("Alice".into()))],
        })
    );

    let stmt = parse_statement("INSERT INTO users VALUES (1, 'Bob')").unwrap();
    let Statement::Insert(insert) = stmt else {
        panic!("expected INSERT");
    };
    assert_eq!(insert.columns, None);
    assert_eq!(insert.values.len(), 2);
}

#[test]
fn select_clauses_round_trip() {
    let stmt = select(
        "SELECT id, name FROM users WHERE age >= 21 ORDER BY name DESC, id LIMIT 10 OFFSET 5",
    );
    assert_eq!(stmt.projection, vec![ident("id"), ident("name")]);
    assert_eq!(stmt.table, "users");
    assert_eq!(
        stmt.selection,
        Some(binary(BinaryOp::Ge, ident("age"), int(21)))
    );
    assert_eq!(
        stmt.order_by,
        vec![
            OrderBy {
                column: "name".into(),
                descending: true
            },
            OrderBy {
                column: "id".into(),
                descending: false
            },
        ]
    );
    assert_eq!(stmt.limit, Some(10));
    assert_eq!(stmt.offset, Some(5));
}

#[test]
fn star_projection() {
    let stmt = select("SELECT * FROM t");
    assert_eq!(stmt.projection, vec![Expr::Star]);
}

#[test]
fn precedence_or_and_comparison() {
    // a = 1 OR b = 2 AND c = 3  =>  (a = 1) OR ((b = 2) AND (c = 3))
    let stmt = select("SELECT * FROM t WHERE a = 1 OR b = 2 AND c = 3");
    let expected = binary(
        BinaryOp::Or,
        binary(BinaryOp::Eq, ident("a"), int(1)),
        binary(
            BinaryOp::And,
            binary(BinaryOp::Eq, ident("b"), int(2)),
            binary(BinaryOp::Eq, ident("c"), int(3)),
        ),
    );
    assert_eq!(stmt.selection, Some(expected));
}

#[test]
fn precedence_arithmetic_over_comparison() {
    // a + b * 2 < 10  =>  (a + (b * 2)) < 10
    let stmt = select("SELECT * FROM t WHERE a + b * 2 < 10");
    let expected = binary(
        BinaryOp::Lt,
        binary(
            BinaryOp::Add,
            ident("a"),
            binary(BinaryOp::Mul, ident("b"), int(2)),
        ),
        int(10),
    );
    assert_eq!(stmt.selection, Some(expected));
}

#[test]
fn not_binds_looser_than_comparison() {
    let stmt = select("SELECT * FROM t WHERE NOT a = 1");
    let expected = Expr::Unary {
        op: UnaryOp::Not,
        expr: Box::new(binary(BinaryOp::Eq, ident("a"), int(1))),
    };
    assert_eq!(stmt.selection, Some(expected));
}

#[test]
fn parenthesized_expressions() {
    let stmt = select("SELECT * FROM t WHERE (a OR b) AND c");
    let expected = binary(
        BinaryOp::And,
        binary(BinaryOp::Or, ident("a"), ident("b")),
        ident("c"),
    );
    assert_eq!(stmt.selection, Some(expected));
}

#[test]
fn signed_literals_and_subtraction() {
    // After WHERE, '-5' is a literal; between operands '-' subtracts.
    let stmt = select("SELECT * FROM t WHERE a = -5");
    assert_eq!(
        stmt.selection,
        Some(binary(BinaryOp::Eq, ident("a"), int(-5)))
    );

    let stmt = select("SELECT * FROM t WHERE a - 5 = 0");
    assert_eq!(
        stmt.selection,
        Some(binary(
            BinaryOp::Eq,
            binary(BinaryOp::Sub, ident("a"), int(5)),
            int(0)
        ))
    );

    let stmt = select("SELECT * FROM t WHERE a = -b");
    assert_eq!(
        stmt.selection,
        Some(binary(
            BinaryOp::Eq,
            ident("a"),
            Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(ident("b"))
            }
        ))
    );
}

#[test]
fn real_literals() {
    let stmt = select("SELECT * FROM t WHERE x = 1.5 OR x = -0.25");
    let expected = binary(
        BinaryOp::Or,
        binary(BinaryOp::Eq, ident("x"), Expr::Literal(Value::Real(1.5))),
        binary(BinaryOp::Eq, ident("x"), Expr::Literal(Value::Real(-0.25))),
    );
    assert_eq!(stmt.selection, Some(expected));
}

#[test]
fn string_escapes() {
    let stmt = parse_statement("INSERT INTO t VALUES ('it''s fine')").unwrap();
    let Statement::Insert(insert) = stmt else {
        panic!("expected INSERT");
    };
    assert_eq!(
        insert.values,
        vec![Expr::Literal(Value::Text("it's fine".into()))]
    );
}

#[test]
fn update_and_delete() {
    let stmt = parse_statement("UPDATE users SET name = 'x', age = age + 1 WHERE id = 3").unwrap();
    let Statement::Update(update) = stmt else {
        panic!("expected UPDATE");
    };
    assert_eq!(update.table, "users");
    assert_eq!(update.assignments.len(), 2);
    assert_eq!(update.assignments[0].0, "name");

    let stmt = parse_statement("DELETE FROM users WHERE id = 3").unwrap();
    assert!(matches!(stmt, Statement::Delete { ref table, selection: Some(_) } if table == "users"));

    let stmt = parse_statement("DELETE FROM users").unwrap();
    assert!(matches!(
        stmt,
        Statement::Delete {
            selection: None,
            ..
        }
    ));
}

#[test]
fn index_statements() {
    let stmt = parse_statement("CREATE UNIQUE INDEX idx_name ON users (name)").unwrap();
    assert_eq!(
        stmt,
        Statement::CreateIndex {
            name: "idx_name".into(),
            table: "users".into(),
            columns: vec!["name".into()],
            unique: true,
        }
    );

    let stmt = parse_statement("CREATE INDEX idx_pair ON users (a, b)").unwrap();
    assert!(
        matches!(stmt, Statement::CreateIndex { ref columns, unique: false, .. } if columns.len() == 2)
    );

    let stmt = parse_statement("DROP INDEX idx_name").unwrap();
    assert_eq!(
        stmt,
        Statement::DropIndex {
            name: "idx_name".into()
        }
    );
}

#[test]
fn explain_and_analyze() {
    let stmt = parse_statement("EXPLAIN SELECT * FROM t WHERE id = 1").unwrap();
    let Statement::Explain(inner) = stmt else {
        panic!("expected EXPLAIN");
    };
    assert!(matches!(*inner, Statement::Select(_)));

    assert_eq!(
        parse_statement("ANALYZE").unwrap(),
        Statement::Analyze { table: None }
    );
    assert_eq!(
        parse_statement("ANALYZE users").unwrap(),
        Statement::Analyze {
            table: Some("users".into())
        }
    );
}

#[test]
fn multiple_statements() {
    let statements = parse_sql(
        "CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1); SELECT * FROM t;",
    )
    .unwrap();
    assert_eq!(statements.len(), 3);
}

#[test]
fn is_null_is_not_in_the_grammar() {
    let err = parse_sql("SELECT * FROM t WHERE x IS NULL").unwrap_err();
    assert!(matches!(err, common::DbError::Parse(_)));
}

#[test]
fn errors_are_bundled() {
    let err = parse_sql("SELECT FROM; DELETE users; SELECT * FROM t WHERE @").unwrap_err();
    let common::DbError::Parse(message) = err else {
        panic!("expected a parse error");
    };
    // One lexer error plus two parser errors, joined.
    assert!(message.contains("; "));
    assert!(message.matches("; ").count() >= 2);
    assert!(message.contains('@'));
}

#[test]
fn trailing_garbage_is_an_error() {
    assert!(parse_sql("SELECT * FROM t garbage garbage").is_err());
    assert!(parse_sql("DROP TABLE t extra").is_err());
}

#[test]
fn negative_limit_is_rejected() {
    assert!(parse_sql("SELECT * FROM t LIMIT -1").is_err());
}
