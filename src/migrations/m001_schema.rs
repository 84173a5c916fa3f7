//! Schema migration - entity, taxonomy and junction tables.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::db::Transaction;
use crate::error::AppError;
use crate::migrations::Migration;

/// Tables for bookmarks, documents, tags and their relations.
pub struct M001Schema;

const TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS bookmark_types (
    id {id},
    type TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS document_types (
    id {id},
    type TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS tags (
    id {id},
    tag TEXT NOT NULL,
    parent_tag {int} REFERENCES tags(id) ON DELETE CASCADE,
    path TEXT NOT NULL DEFAULT ''
);

CREATE UNIQUE INDEX IF NOT EXISTS tags_sibling_label_idx
ON tags (COALESCE(parent_tag, 0), tag);

CREATE TABLE IF NOT EXISTS bookmarks (
    id {id},
    url TEXT NOT NULL UNIQUE,
    title TEXT,
    is_read {int} NOT NULL DEFAULT 0,
    is_collection {int} NOT NULL DEFAULT 0,
    bookmark_type_id {int} REFERENCES bookmark_types(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS bookmark_tags (
    bookmark_id {int} NOT NULL REFERENCES bookmarks(id) ON DELETE CASCADE,
    tag_id {int} NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (bookmark_id, tag_id)
);

CREATE TABLE IF NOT EXISTS documents (
    id {id},
    path TEXT NOT NULL UNIQUE,
    document_type_id {int} REFERENCES document_types(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS document_tags (
    document_id {int} NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    tag_id {int} NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (document_id, tag_id)
);

CREATE TABLE IF NOT EXISTS document_links (
    source_id {int} NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    destination_id {int} NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    PRIMARY KEY (source_id, destination_id)
);
"#;

impl Migration for M001Schema {
    fn id(&self) -> &'static str {
        "m001_schema"
    }

    fn version(&self) -> u32 {
        1
    }

    fn description(&self) -> &'static str {
        "Entity, taxonomy and junction tables"
    }

    fn up<'a>(&'a self, ctx: &'a dyn Transaction) -> BoxFuture<'a, Result<(), AppError>> {
        async move { ctx.batch_sql(&ctx.dialect().ddl(TABLES)).await }.boxed()
    }
}
