//! Metadata store abstraction.
//!
//! The store is an external row-oriented persistence layer. The uploader and
//! the search only need two operations from it: insert one row and run a
//! parameterized query. [`Database`](crate::db::Database) implements this
//! trait on SQLite.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Table holding one row per stored file.
pub const FILES_TABLE: &str = "files";

/// Column names of the files table.
pub mod columns {
    pub const ID: &str = "ID";
    pub const NAME: &str = "NAME";
    pub const BASE_NAME: &str = "BASE_NAME";
    pub const EXT: &str = "EXT";
    pub const SIZE: &str = "SIZE";
    pub const HASH: &str = "HASH";
    pub const PATH: &str = "PATH";
    pub const TYPE: &str = "TYPE";
    pub const TITLE: &str = "TITLE";
    pub const USER_ID: &str = "USER_ID";
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Null,
}

impl StoreValue {
    /// Get the value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StoreValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer, if it is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            StoreValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, StoreValue::Null)
    }
}

impl fmt::Display for StoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreValue::Integer(v) => write!(f, "{v}"),
            StoreValue::Real(v) => write!(f, "{v}"),
            StoreValue::Text(s) => f.write_str(s),
            StoreValue::Null => f.write_str("NULL"),
        }
    }
}

impl From<i64> for StoreValue {
    fn from(v: i64) -> Self {
        StoreValue::Integer(v)
    }
}

impl From<f64> for StoreValue {
    fn from(v: f64) -> Self {
        StoreValue::Real(v)
    }
}

impl From<&str> for StoreValue {
    fn from(s: &str) -> Self {
        StoreValue::Text(s.to_string())
    }
}

impl From<String> for StoreValue {
    fn from(s: String) -> Self {
        StoreValue::Text(s)
    }
}

impl<T: Into<StoreValue>> From<Option<T>> for StoreValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(StoreValue::Null)
    }
}

/// One result row, keyed by column name.
pub type StoreRow = BTreeMap<String, StoreValue>;

/// Row store used for file metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert one row and return its identifier.
    ///
    /// `columns` and `values` are matched by position.
    async fn insert(&self, table: &str, columns: &[String], values: &[StoreValue]) -> Result<i64>;

    /// Run a query with positional `?` parameters and return all rows.
    async fn select_many(&self, query: &str, params: &[StoreValue]) -> Result<Vec<StoreRow>>;
}

/// Check that `name` is a plain SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
///
/// Table and column names are interpolated into SQL text, so anything else
/// is rejected before a statement is built.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("NAME"));
        assert!(is_valid_identifier("user_id"));
        assert!(is_valid_identifier("_private2"));

        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("NAME`"));
        assert!(!is_valid_identifier("a b"));
        assert!(!is_valid_identifier("x; DROP TABLE files"));
    }

    #[test]
    fn test_store_value_conversions() {
        assert_eq!(StoreValue::from(5_i64), StoreValue::Integer(5));
        assert_eq!(StoreValue::from("a"), StoreValue::Text("a".to_string()));
        assert_eq!(StoreValue::from(None::<i64>), StoreValue::Null);
        assert_eq!(StoreValue::from(Some("b")), StoreValue::Text("b".to_string()));
    }

    #[test]
    fn test_store_value_accessors() {
        assert_eq!(StoreValue::Text("x".to_string()).as_text(), Some("x"));
        assert_eq!(StoreValue::Integer(1).as_text(), None);
        assert_eq!(StoreValue::Integer(7).as_integer(), Some(7));
        assert!(StoreValue::Null.is_null());
        assert_eq!(StoreValue::Null.to_string(), "NULL");
    }
}
