//! Storage-side rows, one struct per entity table.
//!
//! Field names match column names, so rows decode with [`Row::decode`].
//!
//! [`Row::decode`]: crate::db::Row::decode

use serde::{Deserialize, Serialize};

use crate::db::SqlValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub is_read: i64,
    pub is_collection: i64,
    pub bookmark_type_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl BookmarkRecord {
    /// Every column except `id`.
    pub const COLUMNS: &'static [&'static str] = &[
        "url",
        "title",
        "is_read",
        "is_collection",
        "bookmark_type_id",
        "created_at",
        "updated_at",
        "deleted_at",
    ];

    /// Values in [`Self::COLUMNS`] order.
    pub fn values(&self) -> Vec<SqlValue> {
        vec![
            self.url.clone().into(),
            self.title.clone().into(),
            self.is_read.into(),
            self.is_collection.into(),
            self.bookmark_type_id.into(),
            self.created_at.clone().into(),
            self.updated_at.clone().into(),
            self.deleted_at.clone().into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    pub path: String,
    pub document_type_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl DocumentRecord {
    pub const COLUMNS: &'static [&'static str] = &[
        "path",
        "document_type_id",
        "created_at",
        "updated_at",
        "deleted_at",
    ];

    pub fn values(&self) -> Vec<SqlValue> {
        vec![
            self.path.clone().into(),
            self.document_type_id.into(),
            self.created_at.clone().into(),
            self.updated_at.clone().into(),
            self.deleted_at.clone().into(),
        ]
    }
}

/// A `tags` row. `path` is a [`TagPath`](super::TagPath) in text form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: i64,
    pub tag: String,
    pub parent_tag: Option<i64>,
    pub path: String,
}

impl TagRecord {
    pub const COLUMNS: &'static [&'static str] = &["tag", "parent_tag", "path"];

    pub fn values(&self) -> Vec<SqlValue> {
        vec![
            self.tag.clone().into(),
            self.parent_tag.into(),
            self.path.clone().into(),
        ]
    }
}

/// A row of `bookmark_types` or `document_types`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    pub id: i64,
    #[serde(rename = "type")]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Row;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_values_follow_columns() {
        let record = TagRecord {
            id: 3,
            tag: "rust".into(),
            parent_tag: None,
            path: "3".into(),
        };
        let values = record.values();
        assert_eq!(values.len(), TagRecord::COLUMNS.len());
        assert_eq!(values[1], SqlValue::Null);
    }

    #[test]
    fn test_type_record_decodes_type_column() {
        let row = Row::new(HashMap::from([
            ("id".to_string(), json!(2)),
            ("type".to_string(), json!("article")),
        ]));
        let record: TypeRecord = row.decode().unwrap();
        assert_eq!(record.name, "article");
    }
}
