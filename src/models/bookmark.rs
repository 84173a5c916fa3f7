//! Bookmark entity.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Identifiable, TagRef};
use crate::ops::{FilterOperation, UpdateOperation};

/// A saved URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub is_read: bool,
    /// Points at a list of other links rather than a single page.
    pub is_collection: bool,
    /// Name of an entry in the bookmark type taxonomy.
    pub bookmark_type: Option<String>,
    pub tags: BTreeSet<TagRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Bookmark {
    /// New unsaved bookmark stamped with the current time.
    pub fn new(url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            url: url.into(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

impl Identifiable for Bookmark {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// Field-keyed bookmark filter; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookmarkFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<FilterOperation<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<FilterOperation<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<FilterOperation<Option<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<FilterOperation<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_collection: Option<FilterOperation<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark_type: Option<FilterOperation<Option<String>>>,
    /// `Equal(None)` matches untagged bookmarks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<FilterOperation<Option<TagRef>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<FilterOperation<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<FilterOperation<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<FilterOperation<Option<DateTime<Utc>>>>,
}

impl BookmarkFilter {
    /// Soft-deleted bookmarks.
    pub fn deleted() -> Self {
        Self {
            deleted_at: Some(FilterOperation::NotEqual(None)),
            ..Default::default()
        }
    }

    /// The default listing: everything not soft-deleted.
    pub fn not_deleted() -> Self {
        Self {
            deleted_at: Some(FilterOperation::Equal(None)),
            ..Default::default()
        }
    }

    pub fn untagged() -> Self {
        Self {
            tags: Some(FilterOperation::Equal(None)),
            ..Default::default()
        }
    }
}

/// Partial bookmark update. The id is not updatable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookmarkUpdater {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<UpdateOperation<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<UpdateOperation<Option<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<UpdateOperation<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_collection: Option<UpdateOperation<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark_type: Option<UpdateOperation<Option<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<UpdateOperation<BTreeSet<TagRef>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<UpdateOperation<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<UpdateOperation<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<UpdateOperation<Option<DateTime<Utc>>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_wire_format_skips_unset_fields() {
        let filter = BookmarkFilter {
            url: Some(FilterOperation::Like("https://%".into())),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"url": {"operator": "Like", "operand": "https://%"}})
        );

        let parsed: BookmarkFilter = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed, BookmarkFilter::default());
    }

    #[test]
    fn test_predefined_filters() {
        assert_eq!(
            BookmarkFilter::not_deleted().deleted_at,
            Some(FilterOperation::Equal(None))
        );
        assert_eq!(
            BookmarkFilter::deleted().deleted_at,
            Some(FilterOperation::NotEqual(None))
        );
        assert_eq!(
            BookmarkFilter::untagged().tags,
            Some(FilterOperation::Equal(None))
        );
    }
}
