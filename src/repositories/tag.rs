//! Tag repository.
//!
//! Keeps the materialized `path` column consistent with `parent_tag`:
//! inserting assigns the path once the id is known, moving a tag re-paths
//! its whole subtree, listing a tag under `subtags` moves it under the
//! writer, and deleting a tag deletes its subtree.

use async_trait::async_trait;

use crate::context::Context;
use crate::convert::references::require_in_filter;
use crate::convert::{tag_record, tag_relations, tag_to_domain, TagPath, TagRecord};
use crate::db::{Database, QueryExt, Row, Transaction};
use crate::di::FromContext;
use crate::error::AppError;
use crate::models::{Tag, TagFilter, TagRef, TagUpdater};
use crate::predicate::{tag_predicate, Predicate};
use crate::repositories::table::{insert_record, update_record, EntityTable};

/// Repository for the tag hierarchy.
#[derive(FromContext, Clone)]
pub struct TagRepository {
    db: Database,
}

impl TagRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

async fn stored_path(txn: &dyn Transaction, id: i64) -> Result<Option<TagPath>, AppError> {
    txn.query("SELECT path FROM tags WHERE id = ?")
        .bind(id)
        .fetch_scalar::<String>("path")
        .await?
        .map(|path| TagPath::parse(&path))
        .transpose()
}

async fn set_path(txn: &dyn Transaction, id: i64, path: &TagPath) -> Result<(), AppError> {
    txn.query("UPDATE tags SET path = ? WHERE id = ?")
        .bind(path.to_string())
        .bind(id)
        .run()
        .await?;
    Ok(())
}

/// Rewrites the paths of every descendant of a tag moved from `old` to `new`.
async fn repath_subtree(
    txn: &dyn Transaction,
    old: &TagPath,
    new: &TagPath,
) -> Result<(), AppError> {
    let rows = txn
        .query("SELECT id, path FROM tags WHERE path LIKE ?")
        .bind(old.descendant_pattern())
        .fetch_all()
        .await?;

    tracing::debug!(from = %old, to = %new, descendants = rows.len(), "Re-pathing tag subtree");
    for row in rows {
        let id: i64 = row.get("id")?;
        let path = TagPath::parse(&row.get::<String>("path")?)?;
        if let Some(moved) = path.rebase(old, new) {
            set_path(txn, id, &moved).await?;
        }
    }
    Ok(())
}

async fn children(txn: &dyn Transaction, id: i64) -> Result<Vec<i64>, AppError> {
    let rows = txn
        .query("SELECT id FROM tags WHERE parent_tag = ? ORDER BY id")
        .bind(id)
        .fetch_all()
        .await?;
    rows.iter().map(|row| row.get("id")).collect()
}

/// Moves tag `id` and its subtree under `parent`, or to the top level.
async fn reparent(
    txn: &dyn Transaction,
    id: i64,
    parent: Option<&TagPath>,
) -> Result<(), AppError> {
    let old = stored_path(txn, id)
        .await?
        .ok_or_else(|| AppError::dangling("tag", id))?;
    let new = match parent {
        Some(parent) => parent.child(id),
        None => TagPath::root(id),
    };
    if old == new {
        return Ok(());
    }

    tracing::debug!(tag = id, from = %old, to = %new, "Re-parenting tag");
    txn.query("UPDATE tags SET parent_tag = ?, path = ? WHERE id = ?")
        .bind(parent.map(TagPath::own_id))
        .bind(new.to_string())
        .bind(id)
        .run()
        .await?;
    repath_subtree(txn, &old, &new).await
}

#[async_trait]
impl EntityTable for TagRepository {
    type Entity = Tag;
    type Filter = TagFilter;
    type Updater = TagUpdater;

    const KIND: &'static str = "tag";
    const TABLE: &'static str = "tags";
    const ALIAS: &'static str = "tg";

    fn database(&self) -> &Database {
        &self.db
    }

    async fn predicate(
        &self,
        txn: &dyn Transaction,
        filter: &TagFilter,
    ) -> Result<Predicate, AppError> {
        require_in_filter::<_, TagRef>(txn, filter.parent_path.as_ref()).await?;
        require_in_filter::<_, TagRef>(txn, filter.subtags.as_ref()).await?;
        tag_predicate(filter)
    }

    async fn insert_row(&self, txn: &dyn Transaction, entity: &Tag) -> Result<i64, AppError> {
        let record = tag_record(txn, entity).await?;
        let id = insert_record(
            txn,
            Self::TABLE,
            TagRecord::COLUMNS,
            record.values(),
            record.id,
        )
        .await?;

        let path = TagPath::parse(&record.path)?.with_id(id);
        set_path(txn, id, &path).await?;
        Ok(id)
    }

    async fn update_row(&self, txn: &dyn Transaction, entity: &Tag) -> Result<(), AppError> {
        let record = tag_record(txn, entity).await?;
        let old = stored_path(txn, record.id)
            .await?
            .ok_or_else(|| AppError::missing_primary(<Self as EntityTable>::KIND, record.id))?;

        update_record(
            txn,
            Self::TABLE,
            TagRecord::COLUMNS,
            record.values(),
            record.id,
        )
        .await?;

        let new = TagPath::parse(&record.path)?;
        if new != old {
            repath_subtree(txn, &old, &new).await?;
        }
        Ok(())
    }

    /// Makes the stored children equal `subtags`: listed tags move under this
    /// tag with their subtrees, unlisted children become roots.
    async fn write_relations(
        &self,
        txn: &dyn Transaction,
        entity: &Tag,
        fresh: bool,
    ) -> Result<(), AppError> {
        let wanted = tag_relations(txn, entity).await?;
        let own = stored_path(txn, entity.id)
            .await?
            .ok_or_else(|| AppError::missing_primary(<Self as EntityTable>::KIND, entity.id))?;

        let current = if fresh {
            Vec::new()
        } else {
            children(txn, entity.id).await?
        };
        for id in current.iter().filter(|id| !wanted.contains(id)) {
            reparent(txn, *id, None).await?;
        }
        for id in wanted.iter().filter(|id| !current.contains(id)) {
            reparent(txn, *id, Some(&own)).await?;
        }
        Ok(())
    }

    async fn delete_rows(&self, txn: &dyn Transaction, ids: &[i64]) -> Result<u64, AppError> {
        let mut removed = 0;
        for id in ids {
            // an earlier id in the batch may have taken this subtree with it
            let Some(path) = stored_path(txn, *id).await? else {
                continue;
            };
            let pattern = path.descendant_pattern();

            for junction in ["bookmark_tags", "document_tags"] {
                let sql = format!(
                    "DELETE FROM {} WHERE tag_id IN \
                     (SELECT id FROM tags WHERE id = ? OR path LIKE ?)",
                    junction
                );
                txn.query(&sql).bind(*id).bind(pattern.as_str()).run().await?;
            }
            removed += txn
                .query("DELETE FROM tags WHERE id = ? OR path LIKE ?")
                .bind(*id)
                .bind(pattern.as_str())
                .run()
                .await?;
        }
        Ok(removed)
    }

    async fn to_domain(&self, txn: &dyn Transaction, row: Row) -> Result<Tag, AppError> {
        tag_to_domain(txn, row.decode()?).await
    }
}
