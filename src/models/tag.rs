//! Tag entity and its hierarchy.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{Identifiable, TagRef};
use crate::ops::{FilterOperation, UpdateOperation};

/// A node in the tag tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub tag: String,
    /// Ancestors, root first, immediate parent last. Empty for a root tag.
    pub parent_path: Vec<TagRef>,
    /// Direct children. Writing a tag moves every listed tag under it and
    /// detaches stored children that are not listed.
    pub subtags: BTreeSet<TagRef>,
}

impl Tag {
    /// New unsaved root tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// New unsaved tag under `parent`.
    pub fn child_of(parent: &Tag, tag: impl Into<String>) -> Self {
        let mut parent_path = parent.parent_path.clone();
        parent_path.push(TagRef::from(parent));
        Self {
            tag: tag.into(),
            parent_path,
            ..Default::default()
        }
    }

    pub fn parent(&self) -> Option<&TagRef> {
        self.parent_path.last()
    }

    pub fn is_root(&self) -> bool {
        self.parent_path.is_empty()
    }
}

impl Identifiable for Tag {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<FilterOperation<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<FilterOperation<String>>,
    /// Matches against any ancestor; `Equal(None)` matches roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<FilterOperation<Option<TagRef>>>,
    /// Matches against direct children; `Equal(None)` matches leaves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtags: Option<FilterOperation<Option<TagRef>>>,
}

impl TagFilter {
    pub fn roots() -> Self {
        Self {
            parent_path: Some(FilterOperation::Equal(None)),
            ..Default::default()
        }
    }

    pub fn leaves() -> Self {
        Self {
            subtags: Some(FilterOperation::Equal(None)),
            ..Default::default()
        }
    }

    /// Every tag below `ancestor`, at any depth.
    pub fn descendants_of(ancestor: &TagRef) -> Self {
        Self {
            parent_path: Some(FilterOperation::Equal(Some(ancestor.clone()))),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagUpdater {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<UpdateOperation<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<UpdateOperation<Vec<TagRef>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtags: Option<UpdateOperation<BTreeSet<TagRef>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_of_extends_parent_path() {
        let root = Tag {
            id: 1,
            tag: "lang".into(),
            ..Default::default()
        };
        let mid = Tag {
            id: 4,
            ..Tag::child_of(&root, "rust")
        };
        let leaf = Tag::child_of(&mid, "async");

        assert!(root.is_root());
        assert_eq!(
            leaf.parent_path,
            vec![TagRef::new(1, "lang"), TagRef::new(4, "rust")]
        );
        assert_eq!(leaf.parent(), Some(&TagRef::new(4, "rust")));
    }
}
