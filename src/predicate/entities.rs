//! Field-to-target bindings for each entity filter.
//!
//! Entity tables are aliased `bm` (bookmarks), `doc` (documents) and `tg`
//! (tags); repositories select from them under the same aliases.

use crate::error::AppError;
use crate::models::{BookmarkFilter, DocumentFilter, TagFilter};
use crate::predicate::{Predicate, PredicateBuilder, Relation, Target};

const BOOKMARK_TYPE: Relation = Relation {
    source: "bookmark_types bt",
    correlation: "bt.id = bm.bookmark_type_id",
    value: "bt.type",
};

const BOOKMARK_TAGS: Relation = Relation {
    source: "bookmark_tags bt_tags",
    correlation: "bt_tags.bookmark_id = bm.id",
    value: "bt_tags.tag_id",
};

const DOCUMENT_TYPE: Relation = Relation {
    source: "document_types dt",
    correlation: "dt.id = doc.document_type_id",
    value: "dt.type",
};

const DOCUMENT_TAGS: Relation = Relation {
    source: "document_tags dtag",
    correlation: "dtag.document_id = doc.id",
    value: "dtag.tag_id",
};

const LINKED_DOCUMENTS: Relation = Relation {
    source: "document_links lout",
    correlation: "lout.source_id = doc.id",
    value: "lout.destination_id",
};

const BACKLINKED_DOCUMENTS: Relation = Relation {
    source: "document_links lin",
    correlation: "lin.destination_id = doc.id",
    value: "lin.source_id",
};

/// Ancestors are the tags whose path is a proper prefix of ours.
const TAG_ANCESTORS: Relation = Relation {
    source: "tags anc",
    correlation: "tg.path LIKE anc.path || ';%'",
    value: "anc.id",
};

const TAG_CHILDREN: Relation = Relation {
    source: "tags child",
    correlation: "child.parent_tag = tg.id",
    value: "child.id",
};

pub fn bookmark_predicate(filter: &BookmarkFilter) -> Result<Predicate, AppError> {
    Ok(PredicateBuilder::new()
        .field(Target::Column("bm.id"), filter.id.as_ref())?
        .field(Target::Column("bm.url"), filter.url.as_ref())?
        .field(Target::Column("bm.title"), filter.title.as_ref())?
        .field(Target::Column("bm.is_read"), filter.is_read.as_ref())?
        .field(Target::Column("bm.is_collection"), filter.is_collection.as_ref())?
        .field(Target::Relation(BOOKMARK_TYPE), filter.bookmark_type.as_ref())?
        .field(Target::Relation(BOOKMARK_TAGS), filter.tags.as_ref())?
        .field(Target::Column("bm.created_at"), filter.created_at.as_ref())?
        .field(Target::Column("bm.updated_at"), filter.updated_at.as_ref())?
        .field(Target::Column("bm.deleted_at"), filter.deleted_at.as_ref())?
        .build())
}

pub fn document_predicate(filter: &DocumentFilter) -> Result<Predicate, AppError> {
    Ok(PredicateBuilder::new()
        .field(Target::Column("doc.id"), filter.id.as_ref())?
        .field(Target::Column("doc.path"), filter.path.as_ref())?
        .field(Target::Relation(DOCUMENT_TYPE), filter.document_type.as_ref())?
        .field(Target::Relation(DOCUMENT_TAGS), filter.tags.as_ref())?
        .field(Target::Relation(LINKED_DOCUMENTS), filter.linked_documents.as_ref())?
        .field(
            Target::Relation(BACKLINKED_DOCUMENTS),
            filter.backlinked_documents.as_ref(),
        )?
        .field(Target::Column("doc.created_at"), filter.created_at.as_ref())?
        .field(Target::Column("doc.updated_at"), filter.updated_at.as_ref())?
        .field(Target::Column("doc.deleted_at"), filter.deleted_at.as_ref())?
        .build())
}

pub fn tag_predicate(filter: &TagFilter) -> Result<Predicate, AppError> {
    Ok(PredicateBuilder::new()
        .field(Target::Column("tg.id"), filter.id.as_ref())?
        .field(Target::Column("tg.tag"), filter.tag.as_ref())?
        .field(Target::Relation(TAG_ANCESTORS), filter.parent_path.as_ref())?
        .field(Target::Relation(TAG_CHILDREN), filter.subtags.as_ref())?
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlValue;
    use crate::models::TagRef;
    use crate::ops::FilterOperation;

    #[test]
    fn test_empty_filter_matches_everything() {
        assert_eq!(
            bookmark_predicate(&BookmarkFilter::default()).unwrap(),
            Predicate::always()
        );
        assert_eq!(
            tag_predicate(&TagFilter::default()).unwrap(),
            Predicate::always()
        );
    }

    #[test]
    fn test_not_deleted_listing() {
        let p = bookmark_predicate(&BookmarkFilter::not_deleted()).unwrap();
        assert_eq!(p.sql, "bm.deleted_at IS NULL");
    }

    #[test]
    fn test_bool_and_ref_operands_become_integers() {
        let filter = DocumentFilter {
            tags: Some(FilterOperation::Equal(Some(TagRef::new(7, "rust")))),
            ..Default::default()
        };
        let p = document_predicate(&filter).unwrap();
        assert_eq!(p.params, vec![SqlValue::Integer(7)]);

        let filter = BookmarkFilter {
            is_read: Some(FilterOperation::Equal(true)),
            url: Some(FilterOperation::Like("%rust%".into())),
            ..Default::default()
        };
        let p = bookmark_predicate(&filter).unwrap();
        assert_eq!(p.sql, "(bm.url LIKE ? AND bm.is_read = ?)");
        assert_eq!(
            p.params,
            vec![SqlValue::Text("%rust%".into()), SqlValue::Integer(1)]
        );
    }

    #[test]
    fn test_roots_have_no_ancestor() {
        let p = tag_predicate(&TagFilter::roots()).unwrap();
        assert_eq!(
            p.sql,
            "NOT (EXISTS (SELECT 1 FROM tags anc WHERE tg.path LIKE anc.path || ';%'))"
        );
    }

    #[test]
    fn test_timestamps_compare_as_text() {
        let at = chrono::Utc::now();
        let filter = BookmarkFilter {
            created_at: Some(FilterOperation::GreaterThan(at)),
            ..Default::default()
        };
        let p = bookmark_predicate(&filter).unwrap();
        assert_eq!(p.params, vec![SqlValue::Text(crate::convert::time::encode(&at))]);
    }
}
