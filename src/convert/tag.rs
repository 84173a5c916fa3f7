//! Tag <-> storage conversion, including the materialized path.

use std::collections::BTreeSet;

use crate::convert::path::TagPath;
use crate::convert::records::TagRecord;
use crate::convert::references::{require, tag_refs};
use crate::db::{QueryExt, SqlExecutor};
use crate::error::AppError;
use crate::models::{Tag, TagRef};

fn hierarchy_error(tag: &Tag, reason: impl Into<String>) -> AppError {
    AppError::InvalidTagHierarchy {
        tag_id: tag.id,
        reason: reason.into(),
    }
}

async fn stored_path<E: SqlExecutor + ?Sized>(exec: &E, id: i64) -> Result<TagPath, AppError> {
    let path = exec
        .query("SELECT path FROM tags WHERE id = ?")
        .bind(id)
        .fetch_scalar::<String>("path")
        .await?
        .ok_or_else(|| AppError::dangling("tag", id))?;
    TagPath::parse(&path)
}

/// Builds the `tags` row after validating the parent path.
///
/// The parent path must name existing tags, may not contain the tag itself
/// or repeat an entry, and must equal the stored ancestry of the immediate
/// parent. For an unsaved tag (id 0) the path ends in `0`; the repository
/// rewrites it once the id is assigned.
pub async fn tag_record<E: SqlExecutor + ?Sized>(
    exec: &E,
    tag: &Tag,
) -> Result<TagRecord, AppError> {
    let mut seen = BTreeSet::new();
    for ancestor in &tag.parent_path {
        if tag.id != 0 && ancestor.id == tag.id {
            return Err(hierarchy_error(tag, "a tag cannot be its own ancestor"));
        }
        if ancestor.id != 0 && !seen.insert(ancestor.id) {
            return Err(hierarchy_error(
                tag,
                format!("parent path repeats tag {}", ancestor.id),
            ));
        }
    }

    let ancestors = require(exec, &tag.parent_path).await?;

    if let Some(parent) = tag.parent() {
        let stored = stored_path(exec, parent.id).await?;
        let mut expected = stored.ancestors().to_vec();
        expected.push(stored.own_id());
        if expected != ancestors {
            return Err(hierarchy_error(
                tag,
                format!(
                    "parent path does not match the stored ancestry '{}' of tag {}",
                    stored, parent.id
                ),
            ));
        }
    }

    Ok(TagRecord {
        id: tag.id,
        tag: tag.tag.clone(),
        parent_tag: tag.parent().map(|p| p.id),
        path: TagPath::new(ancestors, tag.id).to_string(),
    })
}

/// Verifies the subtag references and returns their ids.
///
/// A subtag may not be the tag itself or one of its ancestors. The
/// repository records them by re-parenting each listed tag.
pub async fn tag_relations<E: SqlExecutor + ?Sized>(
    exec: &E,
    tag: &Tag,
) -> Result<Vec<i64>, AppError> {
    let ids = require(exec, &tag.subtags).await?;
    for id in &ids {
        if *id == tag.id || tag.parent_path.iter().any(|a| a.id == *id) {
            return Err(hierarchy_error(
                tag,
                format!("tag {} cannot be both ancestor and subtag", id),
            ));
        }
    }
    Ok(ids)
}

pub async fn tag_to_storage<E: SqlExecutor + ?Sized>(
    exec: &E,
    tag: &Tag,
) -> Result<(TagRecord, Vec<i64>), AppError> {
    let record = tag_record(exec, tag).await?;
    let subtags = tag_relations(exec, tag).await?;
    Ok((record, subtags))
}

/// Rebuilds a tag from its row: ancestors from `path`, children from the
/// rows naming it as `parent_tag`.
pub async fn tag_to_domain<E: SqlExecutor + ?Sized>(
    exec: &E,
    record: TagRecord,
) -> Result<Tag, AppError> {
    let path = TagPath::parse(&record.path)?;
    if path.own_id() != record.id {
        return Err(AppError::Conversion(format!(
            "Tag {} has path '{}' ending in another id",
            record.id, path
        )));
    }
    if path.parent() != record.parent_tag {
        return Err(AppError::Conversion(format!(
            "Tag {} has path '{}' disagreeing with parent {:?}",
            record.id, path, record.parent_tag
        )));
    }

    let mut parent_path = Vec::with_capacity(path.depth());
    for id in path.ancestors() {
        let row = exec
            .query("SELECT id, tag FROM tags WHERE id = ?")
            .bind(*id)
            .fetch_one()
            .await?
            .ok_or_else(|| {
                AppError::Conversion(format!(
                    "Tag {} lists missing ancestor {}",
                    record.id, id
                ))
            })?;
        parent_path.push(row.decode::<TagRef>()?);
    }

    let subtags = tag_refs(
        exec,
        "SELECT id, tag FROM tags WHERE parent_tag = ?",
        record.id,
    )
    .await?;

    Ok(Tag {
        id: record.id,
        tag: record.tag,
        parent_path,
        subtags,
    })
}
