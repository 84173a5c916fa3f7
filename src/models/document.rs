//! Document entity.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DocumentRef, Identifiable, TagRef};
use crate::ops::{FilterOperation, UpdateOperation};

/// A note or file tracked by path.
///
/// `linked_documents` are outgoing links, `backlinked_documents` incoming
/// ones; together they form a directed graph between documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub path: String,
    pub document_type: Option<String>,
    pub tags: BTreeSet<TagRef>,
    pub linked_documents: BTreeSet<DocumentRef>,
    pub backlinked_documents: BTreeSet<DocumentRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            path: path.into(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

impl Identifiable for Document {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<FilterOperation<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<FilterOperation<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<FilterOperation<Option<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<FilterOperation<Option<TagRef>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_documents: Option<FilterOperation<Option<DocumentRef>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backlinked_documents: Option<FilterOperation<Option<DocumentRef>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<FilterOperation<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<FilterOperation<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<FilterOperation<Option<DateTime<Utc>>>>,
}

impl DocumentFilter {
    pub fn deleted() -> Self {
        Self {
            deleted_at: Some(FilterOperation::NotEqual(None)),
            ..Default::default()
        }
    }

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

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentUpdater {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<UpdateOperation<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<UpdateOperation<Option<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<UpdateOperation<BTreeSet<TagRef>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_documents: Option<UpdateOperation<BTreeSet<DocumentRef>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backlinked_documents: Option<UpdateOperation<BTreeSet<DocumentRef>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<UpdateOperation<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<UpdateOperation<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<UpdateOperation<Option<DateTime<Utc>>>>,
}
