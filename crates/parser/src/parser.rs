//! Recursive-descent statement parsing with Pratt-style expressions.

use crate::ast::*;
use crate::lexer::{Keyword, Token};
use expr::{BinaryOp, Expr, UnaryOp};
use types::{SqlType, Value};

type ParseResult<T> = Result<T, String>;

/// Precedence ladder, loosest first. Prefix NOT binds tighter than AND but
/// looser than comparisons; unary minus binds tighter than mul/div.
const BP_OR: u8 = 1;
const BP_AND: u8 = 2;
const BP_NOT: u8 = 3;
const BP_COMPARISON: u8 = 4;
const BP_ADDITIVE: u8 = 5;
const BP_MULTIPLICATIVE: u8 = 6;
const BP_UNARY: u8 = 7;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    pub errors: Vec<String>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Parse a script of semicolon-separated statements. Problems are
    /// collected per statement; parsing resynchronizes at the next
    /// semicolon and continues.
    pub fn parse_statements(mut self) -> (Vec<Statement>, Vec<String>) {
        let mut statements = Vec::new();
        loop {
            while self.eat(&Token::Semicolon) {}
            if self.at_end() {
                break;
            }
            match self.parse_statement() {
                Ok(stmt) => {
                    statements.push(stmt);
                    if !self.at_end() && !self.check(&Token::Semicolon) {
                        self.errors.push(format!(
                            "unexpected token {} after statement",
                            self.tokens[self.pos]
                        ));
                        self.synchronize();
                    }
                }
                Err(message) => {
                    self.errors.push(message);
                    self.synchronize();
                }
            }
        }
        (statements, self.errors)
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.peek() {
            Some(Token::Keyword(Keyword::Create)) => self.parse_create(),
            Some(Token::Keyword(Keyword::Drop)) => self.parse_drop(),
            Some(Token::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(Token::Keyword(Keyword::Select)) => {
                self.parse_select().map(Statement::Select)
            }
            Some(Token::Keyword(Keyword::Update)) => self.parse_update(),
            Some(Token::Keyword(Keyword::Delete)) => self.parse_delete(),
            Some(Token::Keyword(Keyword::Explain)) => {
                self.advance();
                let inner = self.parse_statement()?;
                Ok(Statement::Explain(Box::new(inner)))
            }
            Some(Token::Keyword(Keyword::Analyze)) => {
                self.advance();
                let table = match self.peek() {
                    Some(Token::Identifier(_)) => Some(self.expect_identifier("table name")?),
                    _ => None,
                };
                Ok(Statement::Analyze { table })
            }
            Some(other) => Err(format!("expected a statement, found {other}")),
            None => Err("expected a statement, found end of input".into()),
        }
    }

    fn parse_create(&mut self) -> ParseResult<Statement> {
        self.expect_keyword(Keyword::Create)?;
        match self.peek() {
            Some(Token::Keyword(Keyword::Table)) => {
                self.advance();
                let name = self.expect_identifier("table name")?;
                self.expect(&Token::LParen)?;
                let mut columns = Vec::new();
                loop {
                    columns.push(self.parse_column_def()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RParen)?;
                Ok(Statement::CreateTable { name, columns })
            }
            Some(Token::Keyword(Keyword::Unique)) | Some(Token::Keyword(Keyword::Index)) => {
                let unique = self.eat(&Token::Keyword(Keyword::Unique));
                self.expect_keyword(Keyword::Index)?;
                let name = self.expect_identifier("index name")?;
                self.expect_keyword(Keyword::On)?;
                let table = self.expect_identifier("table name")?;
                self.expect(&Token::LParen)?;
                let mut columns = Vec::new();
                loop {
                    columns.push(self.expect_identifier("column name")?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RParen)?;
                Ok(Statement::CreateIndex {
                    name,
                    table,
                    columns,
                    unique,
                })
            }
            Some(other) => Err(format!("expected TABLE or INDEX after CREATE, found {other}")),
            None => Err("expected TABLE or INDEX after CREATE".into()),
        }
    }

    fn parse_drop(&mut self) -> ParseResult<Statement> {
        self.expect_keyword(Keyword::Drop)?;
        match self.peek() {
            Some(Token::Keyword(Keyword::Table)) => {
                self.advance();
                let name = self.expect_identifier("table name")?;
                Ok(Statement::DropTable { name })
            }
            Some(Token::Keyword(Keyword::Index)) => {
                self.advance();
                let name = self.expect_identifier("index name")?;
                Ok(Statement::DropIndex { name })
            }
            Some(other) => Err(format!("expected TABLE or INDEX after DROP, found {other}")),
            None => Err("expected TABLE or INDEX after DROP".into()),
        }
    }

    fn parse_column_def(&mut self) -> ParseResult<ColumnDef> {
        let name = self.expect_identifier("column name")?;
        let ty = self.parse_column_type()?;

        let mut primary_key = false;
        let mut not_null = false;
        loop {
            if self.eat(&Token::Keyword(Keyword::Primary)) {
                self.expect_keyword(Keyword::Key)?;
                primary_key = true;
            } else if self.eat(&Token::Keyword(Keyword::Not)) {
                self.expect_keyword(Keyword::Null)?;
                not_null = true;
            } else {
                break;
            }
        }

        Ok(ColumnDef {
            name,
            ty,
            primary_key,
            not_null,
        })
    }

    /// Type names are ordinary identifiers matched case-insensitively;
    /// VARCHAR takes an optional ignored length.
    fn parse_column_type(&mut self) -> ParseResult<SqlType> {
        let word = self.expect_identifier("type name")?;
        let ty = match word.to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" => SqlType::Integer,
            "REAL" | "FLOAT" | "DOUBLE" => SqlType::Real,
            "TEXT" | "STRING" => SqlType::Text,
            "VARCHAR" => {
                if self.eat(&Token::LParen) {
                    match self.advance() {
                        Some(Token::Integer(n)) if n >= 0 => {}
                        other => {
                            return Err(format!(
                                "expected a length in VARCHAR(...), found {}",
                                token_name(other.as_ref())
                            ))
                        }
                    }
                    self.expect(&Token::RParen)?;
                }
                SqlType::Text
            }
            "BOOL" | "BOOLEAN" => SqlType::Boolean,
            other => return Err(format!("unknown column type '{other}'")),
        };
        Ok(ty)
    }

    fn parse_insert(&mut self) -> ParseResult<Statement> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let table = self.expect_identifier("table name")?;

        let columns = if self.eat(&Token::LParen) {
            let mut columns = Vec::new();
            loop {
                columns.push(self.expect_identifier("column name")?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen)?;
            Some(columns)
        } else {
            None
        };

        self.expect_keyword(Keyword::Values)?;
        self.expect(&Token::LParen)?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_expr(0)?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;

        Ok(Statement::Insert(InsertStatement {
            table,
            columns,
            values,
        }))
    }

    fn parse_select(&mut self) -> ParseResult<SelectStatement> {
        self.expect_keyword(Keyword::Select)?;

        let mut projection = Vec::new();
        loop {
            projection.push(self.parse_expr(0)?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        self.expect_keyword(Keyword::From)?;
        let table = self.expect_identifier("table name")?;

        let selection = if self.eat(&Token::Keyword(Keyword::Where)) {
            Some(self.parse_expr(0)?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.eat(&Token::Keyword(Keyword::Order)) {
            self.expect_keyword(Keyword::By)?;
            loop {
                let column = self.expect_identifier("column name")?;
                let descending = if self.eat(&Token::Keyword(Keyword::Desc)) {
                    true
                } else {
                    self.eat(&Token::Keyword(Keyword::Asc));
                    false
                };
                order_by.push(OrderBy { column, descending });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        let limit = if self.eat(&Token::Keyword(Keyword::Limit)) {
            Some(self.expect_non_negative("LIMIT")?)
        } else {
            None
        };
        let offset = if self.eat(&Token::Keyword(Keyword::Offset)) {
            Some(self.expect_non_negative("OFFSET")?)
        } else {
            None
        };

        Ok(SelectStatement {
            projection,
            table,
            selection,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_update(&mut self) -> ParseResult<Statement> {
        self.expect_keyword(Keyword::Update)?;
        let table = self.expect_identifier("table name")?;
        self.expect_keyword(Keyword::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier("column name")?;
            self.expect(&Token::Eq)?;
            let value = self.parse_expr(0)?;
            assignments.push((column, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        let selection = if self.eat(&Token::Keyword(Keyword::Where)) {
            Some(self.parse_expr(0)?)
        } else {
            None
        };

        Ok(Statement::Update(UpdateStatement {
            table,
            assignments,
            selection,
        }))
    }

    fn parse_delete(&mut self) -> ParseResult<Statement> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;
        let table = self.expect_identifier("table name")?;

        let selection = if self.eat(&Token::Keyword(Keyword::Where)) {
            Some(self.parse_expr(0)?)
        } else {
            None
        };

        Ok(Statement::Delete { table, selection })
    }

    /// Pratt expression parsing: parse a prefix, then fold infix operators
    /// whose binding power exceeds `min_bp` (left-associative).
    fn parse_expr(&mut self, min_bp: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_prefix()?;

        while let Some(op) = self.peek_binary_op() {
            let bp = infix_binding_power(op);
            if bp <= min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(bp)?;
            lhs = Expr::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        match self.advance() {
            Some(Token::Keyword(Keyword::Not)) => {
                let operand = self.parse_expr(BP_NOT)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(operand),
                })
            }
            Some(Token::Minus) => {
                let operand = self.parse_expr(BP_UNARY)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(operand),
                })
            }
            Some(Token::Identifier(name)) => Ok(Expr::Identifier(name)),
            Some(Token::Integer(v)) => Ok(Expr::Literal(Value::Integer(v))),
            Some(Token::Real(v)) => Ok(Expr::Literal(Value::Real(v))),
            Some(Token::String(s)) => Ok(Expr::Literal(Value::Text(s))),
            Some(Token::Keyword(Keyword::True)) => Ok(Expr::Literal(Value::Boolean(true))),
            Some(Token::Keyword(Keyword::False)) => Ok(Expr::Literal(Value::Boolean(false))),
            Some(Token::Keyword(Keyword::Null)) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Star) => Ok(Expr::Star),
            Some(Token::LParen) => {
                let inner = self.parse_expr(0)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(other) => Err(format!("expected an expression, found {other}")),
            None => Err("expected an expression, found end of input".into()),
        }
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        match self.peek()? {
            Token::Keyword(Keyword::Or) => Some(BinaryOp::Or),
            Token::Keyword(Keyword::And) => Some(BinaryOp::And),
            Token::Eq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            _ => None,
        }
    }

    // ---- token plumbing ----

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> ParseResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(format!(
                "expected {}, found {}",
                token,
                token_name(self.peek())
            ))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<()> {
        self.expect(&Token::Keyword(keyword))
            .map_err(|_| format!("expected {keyword:?}, found {}", token_name(self.peek())))
    }

    fn expect_identifier(&mut self, what: &str) -> ParseResult<String> {
        match self.advance() {
            Some(Token::Identifier(name)) => Ok(name),
            other => Err(format!("expected {what}, found {}", token_name(other.as_ref()))),
        }
    }

    fn expect_non_negative(&mut self, clause: &str) -> ParseResult<u64> {
        match self.advance() {
            Some(Token::Integer(v)) if v >= 0 => Ok(v as u64),
            other => Err(format!(
                "{clause} takes a non-negative integer, found {}",
                token_name(other.as_ref())
            )),
        }
    }

    /// Skip ahead to the next statement boundary after an error.
    fn synchronize(&mut self) {
        while let Some(token) = self.peek() {
            if token == &Token::Semicolon {
                return;
            }
            self.pos += 1;
        }
    }
}

fn infix_binding_power(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => BP_OR,
        BinaryOp::And => BP_AND,
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            BP_COMPARISON
        }
        BinaryOp::Add | BinaryOp::Sub => BP_ADDITIVE,
        BinaryOp::Mul | BinaryOp::Div => BP_MULTIPLICATIVE,
    }
}

fn token_name(token: Option<&Token>) -> String {
    match token {
        Some(token) => token.to_string(),
        None => "end of input".into(),
    }
}
