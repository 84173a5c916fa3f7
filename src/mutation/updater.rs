//! Updater structs applied to their entities.

use crate::error::AppError;
use crate::models::{
    Bookmark, BookmarkUpdater, Document, DocumentUpdater, Tag, TagUpdater,
};
use crate::mutation::Mutable;

/// A partial update of entity `E`.
pub trait Updater<E> {
    /// True when no field carries an operation.
    fn is_empty(&self) -> bool;

    /// Applies every set field to `target`, in field declaration order.
    ///
    /// Stops at the first failing field; `target` may then be partially
    /// updated, so callers apply to a copy they can discard.
    fn apply(&self, target: &mut E) -> Result<(), AppError>;
}

macro_rules! impl_updater {
    ($updater:ty => $entity:ty { $($field:ident),+ $(,)? }) => {
        impl Updater<$entity> for $updater {
            fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())+
            }

            fn apply(&self, target: &mut $entity) -> Result<(), AppError> {
                $(
                    if let Some(op) = &self.$field {
                        target.$field.mutate(stringify!($field), op)?;
                    }
                )+
                Ok(())
            }
        }
    };
}

impl_updater!(BookmarkUpdater => Bookmark {
    url,
    title,
    is_read,
    is_collection,
    bookmark_type,
    tags,
    created_at,
    updated_at,
    deleted_at,
});

impl_updater!(DocumentUpdater => Document {
    path,
    document_type,
    tags,
    linked_documents,
    backlinked_documents,
    created_at,
    updated_at,
    deleted_at,
});

impl_updater!(TagUpdater => Tag { tag, parent_path, subtags });

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagRef;
    use crate::ops::UpdateOperation;

    #[test]
    fn test_empty_updater() {
        assert!(BookmarkUpdater::default().is_empty());
        let updater = TagUpdater {
            tag: Some(UpdateOperation::Set("x".into())),
            ..Default::default()
        };
        assert!(!updater.is_empty());
    }

    #[test]
    fn test_apply_touches_only_set_fields() {
        let mut bookmark = Bookmark::new("https://example.com");
        bookmark.id = 9;
        bookmark.title = Some("Example".into());
        let before = bookmark.clone();

        let updater = BookmarkUpdater {
            is_read: Some(UpdateOperation::Set(true)),
            tags: Some(UpdateOperation::Append([TagRef::new(1, "rust")].into())),
            ..Default::default()
        };
        updater.apply(&mut bookmark).unwrap();

        assert!(bookmark.is_read);
        assert_eq!(bookmark.tags.len(), 1);
        assert_eq!(bookmark.id, before.id);
        assert_eq!(bookmark.title, before.title);
        assert_eq!(bookmark.url, before.url);
    }

    #[test]
    fn test_later_updater_wins() {
        let mut document = Document::new("a.md");
        let first = DocumentUpdater {
            path: Some(UpdateOperation::Set("b.md".into())),
            ..Default::default()
        };
        let second = DocumentUpdater {
            path: Some(UpdateOperation::Set("c.md".into())),
            ..Default::default()
        };
        first.apply(&mut document).unwrap();
        second.apply(&mut document).unwrap();
        assert_eq!(document.path, "c.md");
    }

    #[test]
    fn test_invalid_operator_names_field() {
        let mut tag = Tag::new("rust");
        let updater = TagUpdater {
            tag: Some(UpdateOperation::Increment("1".into())),
            ..Default::default()
        };
        let err = updater.apply(&mut tag).unwrap_err();
        assert!(err.to_string().contains("tag does not support Increment"));
    }
}
