use std::cmp::Ordering;
use std::fmt;

/// Column types supported by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Boolean,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
            SqlType::Boolean => "BOOLEAN",
        };
        f.write_str(name)
    }
}

/// A tagged scalar. `Null` is its own variant; a null's original column tag
/// is not observable through any comparison, so it does not carry one.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type tag, or `None` for NULL.
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            Value::Integer(_) => Some(SqlType::Integer),
            Value::Real(_) => Some(SqlType::Real),
            Value::Text(_) => Some(SqlType::Text),
            Value::Boolean(_) => Some(SqlType::Boolean),
            Value::Null => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Same-tag comparison. Cross-tag pairs and NULLs compare as `None`;
    /// the executor turns that into `false`.
    pub fn cmp_same_type(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Real(a), Value::Real(b)) => Some(a.total_cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Value equality: two NULLs are equal, a NULL never equals a non-NULL,
    /// and cross-tag pairs are unequal.
    pub fn eq_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            _ => self.cmp_same_type(other) == Some(Ordering::Equal),
        }
    }

    /// Total order used by ORDER BY: NULL sorts below every non-NULL, same
    /// tags compare naturally, and cross-tag pairs rank by tag so the sort
    /// comparator stays total.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => match self.cmp_same_type(other) {
                Some(ord) => ord,
                None => self.tag_rank().cmp(&other.tag_rank()),
            },
        }
    }

    fn tag_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) => 2,
            Value::Real(_) => 3,
            Value::Text(_) => 4,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Null => f.write_str("NULL"),
        }
    }
}
