//! Chapter and verse labels
//!
//! The remote index labels chapters and verses inconsistently: sometimes with
//! integers, sometimes with numeric strings, occasionally with free text
//! ("intro", "12a"). Labels keep that distinction all the way into storage so
//! numeric labels sort numerically.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A chapter or verse label
///
/// Variant order matters: the derived `Ord` puts every numeric label before
/// every literal one, the same order SQLite uses for integers versus text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Numeric(i64),
    Literal(String),
}

impl Label {
    /// Parses a textual label; strings made only of ASCII digits become numeric
    pub fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<i64>() {
                return Self::Numeric(n);
            }
        }
        Self::Literal(raw.to_string())
    }

    /// Reads a label from a JSON value
    ///
    /// Returns `None` for null, empty strings and non-scalar values so the
    /// caller can fall back to the next candidate field.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(match n.as_u64().and_then(|u| i64::try_from(u).ok()) {
                Some(u) => Self::Numeric(u),
                None => Self::Literal(n.to_string()),
            }),
            Value::String(s) if !s.is_empty() => Some(Self::parse(s)),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::Literal(_) => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{}", n),
            Self::Literal(s) => f.write_str(s),
        }
    }
}

impl ToSql for Label {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Numeric(n) => n.to_sql(),
            Self::Literal(s) => s.to_sql(),
        }
    }
}

impl FromSql for Label {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(n) => Ok(Self::Numeric(n)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| Self::Literal(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}
