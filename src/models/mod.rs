//! Domain models: entities, references, filters and updaters.

mod bookmark;
mod document;
mod tag;

pub use bookmark::{Bookmark, BookmarkFilter, BookmarkUpdater};
pub use document::{Document, DocumentFilter, DocumentUpdater};
pub use tag::{Tag, TagFilter, TagUpdater};

use serde::{Deserialize, Serialize};

/// Entities with a numeric primary key. `0` means "not assigned yet".
pub trait Identifiable {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

/// Reference to a tag, resolved by `id`.
///
/// Ordered by id first, so sets of references iterate in id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagRef {
    pub id: i64,
    pub tag: String,
}

impl TagRef {
    pub fn new(id: i64, tag: impl Into<String>) -> Self {
        Self {
            id,
            tag: tag.into(),
        }
    }
}

impl From<&Tag> for TagRef {
    fn from(tag: &Tag) -> Self {
        Self::new(tag.id, tag.tag.clone())
    }
}

/// Reference to a document, resolved by `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: i64,
    pub path: String,
}

impl DocumentRef {
    pub fn new(id: i64, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }
}

impl From<&Document> for DocumentRef {
    fn from(document: &Document) -> Self {
        Self::new(document.id, document.path.clone())
    }
}
