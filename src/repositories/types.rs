//! Type taxonomies of bookmarks and documents.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::convert::references::TypeTable;
use crate::convert::TypeRecord;
use crate::db::{finish, guarded, QueryExt, Transaction};
use crate::error::AppError;
use crate::repositories::table::EntityTable;

/// Entity tables that carry a type taxonomy.
pub trait TypedTable: EntityTable {
    const TYPES: TypeTable;
}

/// Maintenance of a type taxonomy.
#[async_trait]
pub trait TypeRepository: Send + Sync {
    /// Adds type names and returns their ids in input order.
    async fn add_types(
        &self,
        cancel: &CancellationToken,
        types: &[String],
    ) -> Result<Vec<i64>, AppError>;

    /// Deletes types, clearing them from every entity that used them.
    async fn delete_types(&self, cancel: &CancellationToken, types: &[String])
        -> Result<(), AppError>;

    /// Renames `old` to `new`; entities follow since they store the id.
    async fn update_type(
        &self,
        cancel: &CancellationToken,
        old: &str,
        new: &str,
    ) -> Result<(), AppError>;

    /// Every type, ordered by id.
    async fn get_types(&self, cancel: &CancellationToken) -> Result<Vec<TypeRecord>, AppError>;
}

fn require_name<'a>(types: &TypeTable, name: &'a str) -> Result<&'a str, AppError> {
    if name.is_empty() {
        return Err(AppError::NilInput(format!("empty {} name", types.kind)));
    }
    Ok(name)
}

async fn find_type(
    txn: &dyn Transaction,
    types: &TypeTable,
    name: &str,
) -> Result<Option<i64>, AppError> {
    let sql = format!("SELECT id FROM {} WHERE type = ?", types.table);
    txn.query(&sql).bind(name).fetch_scalar("id").await
}

async fn add_in(
    txn: &dyn Transaction,
    types: &TypeTable,
    names: &[String],
) -> Result<Vec<i64>, AppError> {
    let sql = format!("INSERT INTO {} (type) VALUES (?) RETURNING id", types.table);
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let id = txn
            .query(&sql)
            .bind(require_name(types, name)?)
            .fetch_scalar::<i64>("id")
            .await?
            .ok_or_else(|| AppError::Internal(format!("INSERT into {} returned no id", types.table)))?;
        ids.push(id);
    }
    Ok(ids)
}

async fn delete_in(
    txn: &dyn Transaction,
    types: &TypeTable,
    names: &[String],
) -> Result<(), AppError> {
    for name in names {
        let id = find_type(txn, types, require_name(types, name)?)
            .await?
            .ok_or_else(|| AppError::missing_primary(types.kind, name))?;

        let clear = format!(
            "UPDATE {} SET {c} = NULL WHERE {c} = ?",
            types.entity_table,
            c = types.column
        );
        txn.query(&clear).bind(id).run().await?;

        let delete = format!("DELETE FROM {} WHERE id = ?", types.table);
        txn.query(&delete).bind(id).run().await?;
    }
    Ok(())
}

async fn rename_in(
    txn: &dyn Transaction,
    types: &TypeTable,
    old: &str,
    new: &str,
) -> Result<(), AppError> {
    let id = find_type(txn, types, require_name(types, old)?)
        .await?
        .ok_or_else(|| AppError::missing_primary(types.kind, old))?;
    if find_type(txn, types, require_name(types, new)?).await?.is_some() {
        return Err(AppError::DuplicateInsertion(format!(
            "{} '{}' already exists",
            types.kind, new
        )));
    }

    let sql = format!("UPDATE {} SET type = ? WHERE id = ?", types.table);
    txn.query(&sql).bind(new).bind(id).run().await?;
    Ok(())
}

#[async_trait]
impl<T: TypedTable> TypeRepository for T {
    async fn add_types(
        &self,
        cancel: &CancellationToken,
        types: &[String],
    ) -> Result<Vec<i64>, AppError> {
        if types.is_empty() {
            return Err(AppError::empty_input());
        }
        tracing::debug!(kind = T::TYPES.kind, count = types.len(), "Adding types");
        let txn = self.database().begin(cancel).await?;
        let outcome = guarded(cancel, add_in(txn.as_ref(), &T::TYPES, types)).await;
        finish(txn, outcome).await
    }

    async fn delete_types(
        &self,
        cancel: &CancellationToken,
        types: &[String],
    ) -> Result<(), AppError> {
        if types.is_empty() {
            return Err(AppError::empty_input());
        }
        tracing::debug!(kind = T::TYPES.kind, count = types.len(), "Deleting types");
        let txn = self.database().begin(cancel).await?;
        let outcome = guarded(cancel, delete_in(txn.as_ref(), &T::TYPES, types)).await;
        finish(txn, outcome).await
    }

    async fn update_type(
        &self,
        cancel: &CancellationToken,
        old: &str,
        new: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(kind = T::TYPES.kind, old, new, "Renaming type");
        let txn = self.database().begin(cancel).await?;
        let outcome = guarded(cancel, rename_in(txn.as_ref(), &T::TYPES, old, new)).await;
        finish(txn, outcome).await
    }

    async fn get_types(&self, cancel: &CancellationToken) -> Result<Vec<TypeRecord>, AppError> {
        let sql = format!("SELECT id, type FROM {} ORDER BY id", T::TYPES.table);
        let txn = self.database().begin(cancel).await?;
        let outcome = guarded(cancel, txn.query(&sql).fetch_as::<TypeRecord>()).await;
        finish(txn, outcome).await
    }
}
