//! Bookmark repository.

use async_trait::async_trait;

use crate::context::Context;
use crate::convert::references::{
    require_in_filter, require_types_in_filter, TypeTable, BOOKMARK_TYPES,
};
use crate::convert::{bookmark_record, bookmark_relations, bookmark_to_domain, BookmarkRecord};
use crate::db::{Database, QueryExt, Row, Transaction};
use crate::di::FromContext;
use crate::error::AppError;
use crate::models::{Bookmark, BookmarkFilter, BookmarkUpdater, TagRef};
use crate::predicate::{bookmark_predicate, Predicate};
use crate::repositories::table::{
    delete_junction, insert_record, placeholders, update_record, EntityTable,
};
use crate::repositories::types::TypedTable;

/// Repository for bookmarks and the bookmark type taxonomy.
#[derive(FromContext, Clone)]
pub struct BookmarkRepository {
    db: Database,
}

impl BookmarkRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntityTable for BookmarkRepository {
    type Entity = Bookmark;
    type Filter = BookmarkFilter;
    type Updater = BookmarkUpdater;

    const KIND: &'static str = "bookmark";
    const TABLE: &'static str = "bookmarks";
    const ALIAS: &'static str = "bm";

    fn database(&self) -> &Database {
        &self.db
    }

    async fn predicate(
        &self,
        txn: &dyn Transaction,
        filter: &BookmarkFilter,
    ) -> Result<Predicate, AppError> {
        require_in_filter::<_, TagRef>(txn, filter.tags.as_ref()).await?;
        require_types_in_filter(txn, &BOOKMARK_TYPES, filter.bookmark_type.as_ref()).await?;
        bookmark_predicate(filter)
    }

    async fn insert_row(&self, txn: &dyn Transaction, entity: &Bookmark) -> Result<i64, AppError> {
        let record = bookmark_record(txn, entity).await?;
        insert_record(
            txn,
            Self::TABLE,
            BookmarkRecord::COLUMNS,
            record.values(),
            record.id,
        )
        .await
    }

    async fn update_row(&self, txn: &dyn Transaction, entity: &Bookmark) -> Result<(), AppError> {
        let record = bookmark_record(txn, entity).await?;
        update_record(
            txn,
            Self::TABLE,
            BookmarkRecord::COLUMNS,
            record.values(),
            record.id,
        )
        .await?;
        Ok(())
    }

    async fn write_relations(
        &self,
        txn: &dyn Transaction,
        entity: &Bookmark,
        fresh: bool,
    ) -> Result<(), AppError> {
        let relations = bookmark_relations(txn, entity).await?;
        if !fresh {
            delete_junction(txn, "bookmark_tags", "bookmark_id", &[entity.id]).await?;
        }
        for tag_id in relations.tags {
            txn.query("INSERT INTO bookmark_tags (bookmark_id, tag_id) VALUES (?, ?)")
                .bind(entity.id)
                .bind(tag_id)
                .run()
                .await?;
        }
        Ok(())
    }

    async fn delete_rows(&self, txn: &dyn Transaction, ids: &[i64]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        delete_junction(txn, "bookmark_tags", "bookmark_id", ids).await?;
        let sql = format!(
            "DELETE FROM bookmarks WHERE id IN ({})",
            placeholders(ids.len())
        );
        txn.query(&sql).bind_all(ids.iter().copied()).run().await
    }

    async fn to_domain(&self, txn: &dyn Transaction, row: Row) -> Result<Bookmark, AppError> {
        bookmark_to_domain(txn, row.decode()?).await
    }
}

impl TypedTable for BookmarkRepository {
    const TYPES: TypeTable = BOOKMARK_TYPES;
}
