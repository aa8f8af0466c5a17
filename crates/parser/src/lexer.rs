//! SQL tokenization: hand-written, single pass, one character of lookahead.

use std::fmt;

/// Reserved words, matched case-insensitively. Type names (INTEGER, TEXT,
/// VARCHAR, ...) are deliberately not reserved; the parser reads them as
/// identifiers in type position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Analyze,
    And,
    Asc,
    By,
    Create,
    Delete,
    Desc,
    Drop,
    Explain,
    False,
    From,
    Index,
    Insert,
    Into,
    Key,
    Limit,
    Not,
    Null,
    Offset,
    On,
    Or,
    Order,
    Primary,
    Select,
    Set,
    Table,
    True,
    Unique,
    Update,
    Values,
    Where,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("ANALYZE", Keyword::Analyze),
    ("AND", Keyword::And),
    ("ASC", Keyword::Asc),
    ("BY", Keyword::By),
    ("CREATE", Keyword::Create),
    ("DELETE", Keyword::Delete),
    ("DESC", Keyword::Desc),
    ("DROP", Keyword::Drop),
    ("EXPLAIN", Keyword::Explain),
    ("FALSE", Keyword::False),
    ("FROM", Keyword::From),
    ("INDEX", Keyword::Index),
    ("INSERT", Keyword::Insert),
    ("INTO", Keyword::Into),
    ("KEY", Keyword::Key),
    ("LIMIT", Keyword::Limit),
    ("NOT", Keyword::Not),
    ("NULL", Keyword::Null),
    ("OFFSET", Keyword::Offset),
    ("ON", Keyword::On),
    ("OR", Keyword::Or),
    ("ORDER", Keyword::Order),
    ("PRIMARY", Keyword::Primary),
    ("SELECT", Keyword::Select),
    ("SET", Keyword::Set),
    ("TABLE", Keyword::Table),
    ("TRUE", Keyword::True),
    ("UNIQUE", Keyword::Unique),
    ("UPDATE", Keyword::Update),
    ("VALUES", Keyword::Values),
    ("WHERE", Keyword::Where),
];

fn lookup_keyword(word: &str) -> Option<Keyword> {
    KEYWORDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(word))
        .map(|(_, kw)| *kw)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    Identifier(String),
    Integer(i64),
    Real(f64),
    String(String),
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Semicolon,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(kw) => write!(f, "{kw:?}"),
            Token::Identifier(name) => write!(f, "'{name}'"),
            Token::Integer(v) => write!(f, "{v}"),
            Token::Real(v) => write!(f, "{v}"),
            Token::String(s) => write!(f, "'{s}'"),
            Token::Eq => f.write_str("="),
            Token::Ne => f.write_str("!="),
            Token::Lt => f.write_str("<"),
            Token::Le => f.write_str("<="),
            Token::Gt => f.write_str(">"),
            Token::Ge => f.write_str(">="),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Semicolon => f.write_str(";"),
        }
    }
}

impl Token {
    /// Whether this token can end an operand, which decides if a following
    /// `-` is a binary operator or the sign of a numeric literal.
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Identifier(_)
                | Token::Integer(_)
                | Token::Real(_)
                | Token::String(_)
                | Token::RParen
                | Token::Keyword(Keyword::True)
                | Token::Keyword(Keyword::False)
                | Token::Keyword(Keyword::Null)
        )
    }
}

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    errors: Vec<String>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the whole input. All problems are collected; the caller
    /// bundles them with any parse errors.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<String>) {
        while let Some(c) = self.peek() {
            match c {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                }
                b'0'..=b'9' => self.lex_number(false),
                b'\'' => self.lex_string(),
                b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.lex_word(),
                b'=' => self.single(Token::Eq),
                b'!' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        self.tokens.push(Token::Ne);
                    } else {
                        self.errors.push(format!(
                            "unexpected character '!' at byte {}",
                            self.pos - 1
                        ));
                    }
                }
                b'<' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        self.tokens.push(Token::Le);
                    } else if self.peek() == Some(b'>') {
                        self.bump();
                        self.tokens.push(Token::Ne);
                    } else {
                        self.tokens.push(Token::Lt);
                    }
                }
                b'>' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        self.tokens.push(Token::Ge);
                    } else {
                        self.tokens.push(Token::Gt);
                    }
                }
                b'+' => self.single(Token::Plus),
                b'-' => {
                    // A '-' starts a signed literal only where a binary
                    // operand cannot have just ended.
                    let signed = !self.tokens.last().is_some_and(Token::ends_operand)
                        && matches!(self.peek_at(1), Some(b'0'..=b'9'));
                    if signed {
                        self.bump();
                        self.lex_number(true);
                    } else {
                        self.single(Token::Minus);
                    }
                }
                b'*' => self.single(Token::Star),
                b'/' => self.single(Token::Slash),
                b'(' => self.single(Token::LParen),
                b')' => self.single(Token::RParen),
                b',' => self.single(Token::Comma),
                b';' => self.single(Token::Semicolon),
                other => {
                    self.errors.push(format!(
                        "unexpected character '{}' at byte {}",
                        other as char, self.pos
                    ));
                    self.bump();
                }
            }
        }
        (self.tokens, self.errors)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.input.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn single(&mut self, token: Token) {
        self.bump();
        self.tokens.push(token);
    }

    fn lex_word(&mut self) {
        let start = self.pos;
        while matches!(self.peek(), Some(b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_')) {
            self.bump();
        }
        let word = std::str::from_utf8(&self.input[start..self.pos])
            .unwrap_or_default()
            .to_string();
        match lookup_keyword(&word) {
            Some(kw) => self.tokens.push(Token::Keyword(kw)),
            None => self.tokens.push(Token::Identifier(word)),
        }
    }

    fn lex_number(&mut self, negative: bool) {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.bump();
        }
        let mut is_real = false;
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            is_real = true;
            self.bump();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.bump();
            }
        }

        let text = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or_default();
        if is_real {
            match text.parse::<f64>() {
                Ok(v) => self.tokens.push(Token::Real(if negative { -v } else { v })),
                Err(e) => self.errors.push(format!("bad numeric literal '{text}': {e}")),
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => self.tokens.push(Token::Integer(if negative { -v } else { v })),
                Err(e) => self.errors.push(format!("bad numeric literal '{text}': {e}")),
            }
        }
    }

    fn lex_string(&mut self) {
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                Some(b'\'') => {
                    // '' inside a string is an escaped quote.
                    if self.peek_at(1) == Some(b'\'') {
                        text.push('\'');
                        self.bump();
                        self.bump();
                    } else {
                        self.bump();
                        self.tokens.push(Token::String(text));
                        return;
                    }
                }
                Some(_) => {
                    let start = self.pos;
                    while !matches!(self.peek(), Some(b'\'') | None) {
                        self.bump();
                    }
                    text.push_str(
                        std::str::from_utf8(&self.input[start..self.pos]).unwrap_or_default(),
                    );
                }
                None => {
                    self.errors.push("unterminated string literal".into());
                    return;
                }
            }
        }
    }
}
