//! SQL front end: hand-written lexer and recursive-descent parser.
//!
//! Errors do not abort at the first problem; lexing and parsing both
//! collect everything they find and the caller gets one bundled
//! `ParseError` message, joined by "; ".

mod ast;
mod lexer;
mod parser;

#[cfg(test)]
mod tests;

pub use ast::{
    ColumnDef, InsertStatement, OrderBy, SelectStatement, Statement, UpdateStatement,
};
pub use lexer::{Keyword, Lexer, Token};

use common::{DbError, DbResult};

/// Parse a script of semicolon-separated SQL statements.
pub fn parse_sql(sql: &str) -> DbResult<Vec<Statement>> {
    let (tokens, mut errors) = Lexer::new(sql).tokenize();
    let (statements, parse_errors) = parser::Parser::new(tokens).parse_statements();
    errors.extend(parse_errors);

    if errors.is_empty() {
        Ok(statements)
    } else {
        Err(DbError::Parse(errors.join("; ")))
    }
}

/// Parse exactly one statement.
pub fn parse_statement(sql: &str) -> DbResult<Statement> {
    let mut statements = parse_sql(sql)?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        n => Err(DbError::Parse(format!("expected one statement, found {n}"))),
    }
}
