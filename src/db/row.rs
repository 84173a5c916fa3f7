//! Row and streaming types for query results.

use crate::db::value::SqlValue;
use crate::error::AppError;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::pin::Pin;

/// Positional parameters, bound in order to the statement's `?` markers.
pub type Params = Vec<SqlValue>;

/// A stream of rows from a query result.
pub type RowStream<'a> = Pin<Box<dyn Stream<Item = Result<Row, AppError>> + Send + 'a>>;

/// A single row from a query result.
///
/// Contains column values as JSON, with typed extraction via [`Row::get`]
/// and whole-row extraction via [`Row::decode`].
#[derive(Debug, Clone, Default)]
pub struct Row {
    data: HashMap<String, JsonValue>,
}

impl Row {
    /// Creates a new row from a map of column names to values.
    pub fn new(data: HashMap<String, JsonValue>) -> Self {
        Self { data }
    }

    /// Gets a value from the row by column name, deserializing to the requested type.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not found or if deserialization fails.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let id: i64 = row.get("id")?;
    /// let count: i64 = row.get("count")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, AppError> {
        self.data
            .get(key)
            .ok_or_else(|| AppError::Conversion(format!("column not found: {}", key)))
            .and_then(|v| {
                serde_json::from_value(v.clone()).map_err(|e| {
                    AppError::Conversion(format!("failed to deserialize '{}': {}", key, e))
                })
            })
    }

    /// Gets a value from the row, returning `None` if the key doesn't exist.
    ///
    /// Still returns an error if the key exists but deserialization fails.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.data.get(key) {
            Some(v) if v.is_null() => Ok(None),
            Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
                AppError::Conversion(format!("failed to deserialize '{}': {}", key, e))
            }),
            None => Ok(None),
        }
    }

    /// Deserializes the whole row into a record struct keyed by column name.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let object = self
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::from_value(JsonValue::Object(object))
            .map_err(|e| AppError::Conversion(format!("failed to decode row: {}", e)))
    }

    /// Returns the raw JSON value for a column, if it exists.
    pub fn get_raw(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    /// Returns all column names in this row.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consumes the row and returns the underlying data map.
    pub fn into_inner(self) -> HashMap<String, JsonValue> {
        self.data
    }
}

impl From<HashMap<String, JsonValue>> for Row {
    fn from(data: HashMap<String, JsonValue>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn row(pairs: &[(&str, JsonValue)]) -> Row {
        Row::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_row_get_string() {
        let row = row(&[("url", json!("https://example.org"))]);
        let url: String = row.get("url").unwrap();
        assert_eq!(url, "https://example.org");
    }

    #[test]
    fn test_row_get_number() {
        let row = row(&[("count", json!(42))]);
        let count: i64 = row.get("count").unwrap();
        assert_eq!(count, 42);
    }

    #[test]
    fn test_row_get_missing_key() {
        let row = Row::default();
        let result: Result<String, _> = row.get("missing");
        assert!(matches!(result, Err(AppError::Conversion(_))));
    }

    #[test]
    fn test_row_get_opt_null() {
        let row = row(&[("title", JsonValue::Null)]);
        let title: Option<String> = row.get_opt("title").unwrap();
        assert_eq!(title, None);
        let other: Option<String> = row.get_opt("missing").unwrap();
        assert_eq!(other, None);
    }

    #[test]
    fn test_row_decode() {
        #[derive(Deserialize)]
        struct Record {
            id: i64,
            tag: String,
            parent_tag: Option<i64>,
        }

        let row = row(&[
            ("id", json!(4)),
            ("tag", json!("rust")),
            ("parent_tag", JsonValue::Null),
        ]);
        let record: Record = row.decode().unwrap();
        assert_eq!(record.id, 4);
        assert_eq!(record.tag, "rust");
        assert_eq!(record.parent_tag, None);
    }

    #[test]
    fn test_row_columns() {
        let row = row(&[("a", json!(1)), ("b", json!(2))]);
        let mut columns: Vec<_> = row.columns().collect();
        columns.sort();
        assert_eq!(columns, vec!["a", "b"]);
        assert_eq!(row.len(), 2);
    }
}
