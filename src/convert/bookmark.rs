//! Bookmark <-> storage conversion.

use crate::convert::references::{decode_flag, require, tag_refs, type_id, type_name, BOOKMARK_TYPES};
use crate::convert::records::BookmarkRecord;
use crate::convert::time;
use crate::db::SqlExecutor;
use crate::error::AppError;
use crate::models::Bookmark;

/// Junction rows owned by a bookmark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkRelations {
    pub tags: Vec<i64>,
}

/// Builds the `bookmarks` row, resolving the type name.
pub async fn bookmark_record<E: SqlExecutor + ?Sized>(
    exec: &E,
    bookmark: &Bookmark,
) -> Result<BookmarkRecord, AppError> {
    Ok(BookmarkRecord {
        id: bookmark.id,
        url: bookmark.url.clone(),
        title: bookmark.title.clone(),
        is_read: i64::from(bookmark.is_read),
        is_collection: i64::from(bookmark.is_collection),
        bookmark_type_id: type_id(exec, &BOOKMARK_TYPES, bookmark.bookmark_type.as_deref())
            .await?,
        created_at: time::encode(&bookmark.created_at),
        updated_at: time::encode(&bookmark.updated_at),
        deleted_at: bookmark.deleted_at.as_ref().map(time::encode),
    })
}

/// Verifies the bookmark's tag references.
pub async fn bookmark_relations<E: SqlExecutor + ?Sized>(
    exec: &E,
    bookmark: &Bookmark,
) -> Result<BookmarkRelations, AppError> {
    Ok(BookmarkRelations {
        tags: require(exec, &bookmark.tags).await?,
    })
}

pub async fn bookmark_to_storage<E: SqlExecutor + ?Sized>(
    exec: &E,
    bookmark: &Bookmark,
) -> Result<(BookmarkRecord, BookmarkRelations), AppError> {
    let record = bookmark_record(exec, bookmark).await?;
    let relations = bookmark_relations(exec, bookmark).await?;
    Ok((record, relations))
}

pub async fn bookmark_to_domain<E: SqlExecutor + ?Sized>(
    exec: &E,
    record: BookmarkRecord,
) -> Result<Bookmark, AppError> {
    let tags = tag_refs(
        exec,
        "SELECT t.id, t.tag FROM bookmark_tags bt JOIN tags t ON t.id = bt.tag_id \
         WHERE bt.bookmark_id = ?",
        record.id,
    )
    .await?;

    Ok(Bookmark {
        id: record.id,
        url: record.url,
        title: record.title,
        is_read: decode_flag("is_read", record.is_read)?,
        is_collection: decode_flag("is_collection", record.is_collection)?,
        bookmark_type: type_name(exec, &BOOKMARK_TYPES, record.bookmark_type_id).await?,
        tags,
        created_at: time::decode(&record.created_at)?,
        updated_at: time::decode(&record.updated_at)?,
        deleted_at: record.deleted_at.as_deref().map(time::decode).transpose()?,
    })
}
