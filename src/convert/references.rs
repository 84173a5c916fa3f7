//! Resolution and verification of cross-entity references.

use std::collections::BTreeSet;

use crate::db::{QueryExt, SqlExecutor, SqlValue};
use crate::error::AppError;
use crate::models::{DocumentRef, TagRef};
use crate::ops::FilterOperation;

/// A reference to a row of another entity table, resolved by id.
pub trait Reference {
    const KIND: &'static str;
    const TABLE: &'static str;

    fn id(&self) -> i64;
}

impl Reference for TagRef {
    const KIND: &'static str = "tag";
    const TABLE: &'static str = "tags";

    fn id(&self) -> i64 {
        self.id
    }
}

impl Reference for DocumentRef {
    const KIND: &'static str = "document";
    const TABLE: &'static str = "documents";

    fn id(&self) -> i64 {
        self.id
    }
}

impl From<TagRef> for SqlValue {
    fn from(r: TagRef) -> Self {
        SqlValue::Integer(r.id)
    }
}

impl From<DocumentRef> for SqlValue {
    fn from(r: DocumentRef) -> Self {
        SqlValue::Integer(r.id)
    }
}

/// One of the two type taxonomies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTable {
    pub kind: &'static str,
    pub table: &'static str,
    /// Foreign-key column on the entity table.
    pub column: &'static str,
    pub entity_table: &'static str,
}

pub const BOOKMARK_TYPES: TypeTable = TypeTable {
    kind: "bookmark type",
    table: "bookmark_types",
    column: "bookmark_type_id",
    entity_table: "bookmarks",
};

pub const DOCUMENT_TYPES: TypeTable = TypeTable {
    kind: "document type",
    table: "document_types",
    column: "document_type_id",
    entity_table: "documents",
};

/// Checks that every reference exists and returns their ids in order.
///
/// A nil reference (id 0) is `NilInput`; a missing row is
/// `ReferenceToNonExistentDependency`.
pub async fn require<'r, E, R, I>(exec: &E, refs: I) -> Result<Vec<i64>, AppError>
where
    E: SqlExecutor + ?Sized,
    R: Reference + 'r,
    I: IntoIterator<Item = &'r R>,
{
    let sql = format!("SELECT id FROM {} WHERE id = ?", R::TABLE);
    let mut ids = Vec::new();
    for r in refs {
        let id = r.id();
        if id == 0 {
            return Err(AppError::NilInput(format!("{} reference with id 0", R::KIND)));
        }
        if exec.query(&sql).bind(id).fetch_one().await?.is_none() {
            return Err(AppError::dangling(R::KIND, id));
        }
        ids.push(id);
    }
    Ok(ids)
}

/// Same as [`require`] for the references a filter mentions.
pub async fn require_in_filter<E, R>(
    exec: &E,
    op: Option<&FilterOperation<Option<R>>>,
) -> Result<(), AppError>
where
    E: SqlExecutor + ?Sized,
    R: Reference,
{
    if let Some(op) = op {
        require(exec, op.operands().into_iter().flatten()).await?;
    }
    Ok(())
}

/// Resolves a type name to its id. `None` stays `None`.
pub async fn type_id<E: SqlExecutor + ?Sized>(
    exec: &E,
    types: &TypeTable,
    name: Option<&str>,
) -> Result<Option<i64>, AppError> {
    let Some(name) = name else {
        return Ok(None);
    };
    let sql = format!("SELECT id FROM {} WHERE type = ?", types.table);
    exec.query(&sql)
        .bind(name)
        .fetch_scalar::<i64>("id")
        .await?
        .map(Some)
        .ok_or_else(|| AppError::dangling(types.kind, name))
}

/// Checks that every type name a filter mentions exists.
pub async fn require_types_in_filter<E: SqlExecutor + ?Sized>(
    exec: &E,
    types: &TypeTable,
    op: Option<&FilterOperation<Option<String>>>,
) -> Result<(), AppError> {
    if let Some(op) = op {
        for name in op.operands().into_iter().flatten() {
            type_id(exec, types, Some(name.as_str())).await?;
        }
    }
    Ok(())
}

/// Resolves a stored type id to its name.
pub async fn type_name<E: SqlExecutor + ?Sized>(
    exec: &E,
    types: &TypeTable,
    id: Option<i64>,
) -> Result<Option<String>, AppError> {
    let Some(id) = id else {
        return Ok(None);
    };
    let sql = format!("SELECT type FROM {} WHERE id = ?", types.table);
    exec.query(&sql)
        .bind(id)
        .fetch_scalar::<String>("type")
        .await?
        .map(Some)
        .ok_or_else(|| AppError::Conversion(format!("Stored {} {} does not exist", types.kind, id)))
}

/// Runs a query selecting `id, tag` and collects the references.
pub async fn tag_refs<E: SqlExecutor + ?Sized>(
    exec: &E,
    sql: &str,
    owner: i64,
) -> Result<BTreeSet<TagRef>, AppError> {
    let refs = exec.query(sql).bind(owner).fetch_as::<TagRef>().await?;
    Ok(refs.into_iter().collect())
}

/// Runs a query selecting `id, path` and collects the references.
pub async fn document_refs<E: SqlExecutor + ?Sized>(
    exec: &E,
    sql: &str,
    owner: i64,
) -> Result<BTreeSet<DocumentRef>, AppError> {
    let refs = exec.query(sql).bind(owner).fetch_as::<DocumentRef>().await?;
    Ok(refs.into_iter().collect())
}

/// Stored booleans are 0 or 1.
pub fn decode_flag(column: &str, value: i64) -> Result<bool, AppError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(AppError::Conversion(format!(
            "Column {} holds {} where 0 or 1 is expected",
            column, other
        ))),
    }
}
