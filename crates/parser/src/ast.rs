use expr::Expr;
use types::SqlType;

/// One SQL statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        name: String,
    },
    Insert(InsertStatement),
    Select(SelectStatement),
    Update(UpdateStatement),
    Delete {
        table: String,
        selection: Option<Expr>,
    },
    CreateIndex {
        name: String,
        table: String,
        columns: Vec<String>,
        unique: bool,
    },
    DropIndex {
        name: String,
    },
    Explain(Box<Statement>),
    Analyze {
        table: Option<String>,
    },
}

/// Column clause of CREATE TABLE.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: SqlType,
    pub primary_key: bool,
    pub not_null: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    /// Explicit column list, if one was written.
    pub columns: Option<Vec<String>>,
    pub values: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectStatement {
    pub projection: Vec<Expr>,
    pub table: String,
    pub selection: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<(String, Expr)>,
    pub selection: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}
