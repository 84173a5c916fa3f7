//! The repository contract and its generic implementation.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::db::{finish, guarded, QueryExt, Transaction};
use crate::error::AppError;
use crate::models::Identifiable;
use crate::mutation::Updater;
use crate::predicate::Predicate;
use crate::repositories::table::{row_exists, EntityTable};

/// CRUD over one entity kind.
///
/// Every call runs in its own transaction: a failure anywhere rolls back the
/// whole batch, and cancelling `cancel` aborts and rolls back.
#[async_trait]
pub trait Repository: Send + Sync {
    type Entity: Identifiable + Clone + Send + Sync + 'static;
    type Filter: Send + Sync;
    type Updater: Updater<Self::Entity> + Send + Sync;

    const KIND: &'static str;

    /// Inserts `models` and returns their ids in input order. Entities with
    /// id 0 get one assigned.
    async fn add(
        &self,
        cancel: &CancellationToken,
        models: &[Self::Entity],
    ) -> Result<Vec<i64>, AppError>;

    /// Overwrites existing entities, relations included.
    async fn replace(
        &self,
        cancel: &CancellationToken,
        models: &[Self::Entity],
    ) -> Result<(), AppError>;

    /// Replaces entities that exist and inserts the rest.
    async fn upsert(
        &self,
        cancel: &CancellationToken,
        models: &[Self::Entity],
    ) -> Result<Vec<i64>, AppError>;

    /// Applies `updater` to the stored state of each model and returns the
    /// updated entities.
    async fn update(
        &self,
        cancel: &CancellationToken,
        models: &[Self::Entity],
        updater: &Self::Updater,
    ) -> Result<Vec<Self::Entity>, AppError>;

    /// Applies `updater` to every match and returns how many there were.
    async fn update_where(
        &self,
        cancel: &CancellationToken,
        filter: &Self::Filter,
        updater: &Self::Updater,
    ) -> Result<u64, AppError>;

    /// Like [`update_where`](Self::update_where), returning the updated entities.
    async fn update_where_returning(
        &self,
        cancel: &CancellationToken,
        filter: &Self::Filter,
        updater: &Self::Updater,
    ) -> Result<Vec<Self::Entity>, AppError>;

    async fn delete(
        &self,
        cancel: &CancellationToken,
        models: &[Self::Entity],
    ) -> Result<(), AppError>;

    /// Deletes every match and returns how many there were.
    async fn delete_where(
        &self,
        cancel: &CancellationToken,
        filter: &Self::Filter,
    ) -> Result<u64, AppError>;

    /// Like [`delete_where`](Self::delete_where), returning the entities as
    /// they were before deletion.
    async fn delete_where_returning(
        &self,
        cancel: &CancellationToken,
        filter: &Self::Filter,
    ) -> Result<Vec<Self::Entity>, AppError>;

    async fn count_where(
        &self,
        cancel: &CancellationToken,
        filter: &Self::Filter,
    ) -> Result<u64, AppError>;

    async fn count_all(&self, cancel: &CancellationToken) -> Result<u64, AppError>;

    async fn does_exist(
        &self,
        cancel: &CancellationToken,
        model: &Self::Entity,
    ) -> Result<bool, AppError>;

    async fn does_exist_where(
        &self,
        cancel: &CancellationToken,
        filter: &Self::Filter,
    ) -> Result<bool, AppError>;

    /// All matches ordered by id; no match is `IneffectiveOperation(EmptyResult)`.
    async fn get_where(
        &self,
        cancel: &CancellationToken,
        filter: &Self::Filter,
    ) -> Result<Vec<Self::Entity>, AppError>;

    /// The match with the lowest id.
    async fn get_first_where(
        &self,
        cancel: &CancellationToken,
        filter: &Self::Filter,
    ) -> Result<Self::Entity, AppError>;

    /// Every entity ordered by id; empty storage gives an empty list.
    async fn get_all(&self, cancel: &CancellationToken) -> Result<Vec<Self::Entity>, AppError>;
}

// ============================================
// Shared flows, each running inside an open transaction
// ============================================

fn require_id<T: EntityTable + ?Sized>(entity: &T::Entity) -> Result<i64, AppError> {
    match entity.id() {
        0 => Err(AppError::NilInput(format!("{} id 0", T::KIND))),
        id => Ok(id),
    }
}

fn require_updates<T: EntityTable + ?Sized>(updater: &T::Updater) -> Result<(), AppError> {
    if updater.is_empty() {
        return Err(AppError::NilInput(format!(
            "{} updater without operations",
            T::KIND
        )));
    }
    Ok(())
}

/// Existence check for Replace/Update/Delete inputs.
async fn require_stored<T: EntityTable + ?Sized>(
    txn: &dyn Transaction,
    entity: &T::Entity,
) -> Result<i64, AppError> {
    let id = require_id::<T>(entity)?;
    if !row_exists(txn, T::TABLE, id).await? {
        return Err(AppError::missing_primary(T::KIND, id));
    }
    Ok(id)
}

async fn select<T: EntityTable + ?Sized>(
    table: &T,
    txn: &dyn Transaction,
    predicate: &Predicate,
    limit: Option<u32>,
) -> Result<Vec<T::Entity>, AppError> {
    let mut sql = format!(
        "SELECT {a}.* FROM {t} {a} WHERE {w} ORDER BY {a}.id",
        a = T::ALIAS,
        t = T::TABLE,
        w = predicate.sql
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let rows = txn
        .query(&sql)
        .bind_all(predicate.params.iter().cloned())
        .fetch_all()
        .await?;
    let mut entities = Vec::with_capacity(rows.len());
    for row in rows {
        entities.push(table.to_domain(txn, row).await?);
    }
    Ok(entities)
}

async fn count<T: EntityTable + ?Sized>(
    txn: &dyn Transaction,
    predicate: &Predicate,
) -> Result<u64, AppError> {
    let sql = format!(
        "SELECT COUNT(*) AS count FROM {t} {a} WHERE {w}",
        a = T::ALIAS,
        t = T::TABLE,
        w = predicate.sql
    );
    let n: i64 = txn
        .query(&sql)
        .bind_all(predicate.params.iter().cloned())
        .fetch_scalar("count")
        .await?
        .unwrap_or(0);
    Ok(u64::try_from(n).unwrap_or(0))
}

async fn load<T: EntityTable + ?Sized>(
    table: &T,
    txn: &dyn Transaction,
    id: i64,
) -> Result<Option<T::Entity>, AppError> {
    let predicate = Predicate::new(format!("{}.id = ?", T::ALIAS), vec![id.into()]);
    Ok(select(table, txn, &predicate, Some(1)).await?.into_iter().next())
}

/// Rows first, then relations, so entities in one batch may reference each
/// other.
async fn add_in<T: EntityTable + ?Sized>(
    table: &T,
    txn: &dyn Transaction,
    models: &[T::Entity],
) -> Result<Vec<i64>, AppError> {
    let mut ids = Vec::with_capacity(models.len());
    for model in models {
        ids.push(table.insert_row(txn, model).await?);
    }
    for (model, id) in models.iter().zip(&ids) {
        let mut saved = model.clone();
        saved.set_id(*id);
        table.write_relations(txn, &saved, true).await?;
    }
    Ok(ids)
}

async fn replace_in<T: EntityTable + ?Sized>(
    table: &T,
    txn: &dyn Transaction,
    models: &[T::Entity],
) -> Result<(), AppError> {
    for model in models {
        require_stored::<T>(txn, model).await?;
    }
    for model in models {
        table.update_row(txn, model).await?;
    }
    for model in models {
        table.write_relations(txn, model, false).await?;
    }
    Ok(())
}

async fn upsert_in<T: EntityTable + ?Sized>(
    table: &T,
    txn: &dyn Transaction,
    models: &[T::Entity],
) -> Result<Vec<i64>, AppError> {
    let mut saved = Vec::with_capacity(models.len());
    for model in models {
        let existing = model.id() != 0 && row_exists(txn, T::TABLE, model.id()).await?;
        let mut entity = model.clone();
        if existing {
            table.update_row(txn, &entity).await?;
        } else {
            let id = table.insert_row(txn, &entity).await?;
            entity.set_id(id);
        }
        saved.push((entity, existing));
    }
    for (entity, existing) in &saved {
        table.write_relations(txn, entity, !existing).await?;
    }
    Ok(saved.iter().map(|(entity, _)| entity.id()).collect())
}

/// Applies `updater` to `entities`, writes them back and reloads them.
async fn apply_in<T: EntityTable + ?Sized>(
    table: &T,
    txn: &dyn Transaction,
    mut entities: Vec<T::Entity>,
    updater: &T::Updater,
) -> Result<Vec<T::Entity>, AppError> {
    for entity in &mut entities {
        updater.apply(entity)?;
    }
    for entity in &entities {
        table.update_row(txn, entity).await?;
    }
    for entity in &entities {
        table.write_relations(txn, entity, false).await?;
    }

    let mut updated = Vec::with_capacity(entities.len());
    for entity in &entities {
        let reloaded = load(table, txn, entity.id())
            .await?
            .ok_or_else(|| AppError::missing_primary(T::KIND, entity.id()))?;
        updated.push(reloaded);
    }
    Ok(updated)
}

async fn update_in<T: EntityTable + ?Sized>(
    table: &T,
    txn: &dyn Transaction,
    models: &[T::Entity],
    updater: &T::Updater,
) -> Result<Vec<T::Entity>, AppError> {
    let mut stored = Vec::with_capacity(models.len());
    for model in models {
        let id = require_id::<T>(model)?;
        let entity = load(table, txn, id)
            .await?
            .ok_or_else(|| AppError::missing_primary(T::KIND, id))?;
        stored.push(entity);
    }
    apply_in(table, txn, stored, updater).await
}

async fn update_where_in<T: EntityTable + ?Sized>(
    table: &T,
    txn: &dyn Transaction,
    filter: &T::Filter,
    updater: &T::Updater,
) -> Result<Vec<T::Entity>, AppError> {
    let predicate = table.predicate(txn, filter).await?;
    let matched = select(table, txn, &predicate, None).await?;
    apply_in(table, txn, matched, updater).await
}

async fn delete_in<T: EntityTable + ?Sized>(
    table: &T,
    txn: &dyn Transaction,
    models: &[T::Entity],
) -> Result<(), AppError> {
    let mut ids = Vec::with_capacity(models.len());
    for model in models {
        ids.push(require_stored::<T>(txn, model).await?);
    }
    table.delete_rows(txn, &ids).await?;
    Ok(())
}

async fn delete_where_in<T: EntityTable + ?Sized>(
    table: &T,
    txn: &dyn Transaction,
    filter: &T::Filter,
) -> Result<Vec<T::Entity>, AppError> {
    let predicate = table.predicate(txn, filter).await?;
    let matched = select(table, txn, &predicate, None).await?;
    let ids: Vec<i64> = matched.iter().map(Identifiable::id).collect();
    table.delete_rows(txn, &ids).await?;
    Ok(matched)
}

// ============================================
// Transaction wrapper
// ============================================

/// Runs `work` in a fresh transaction, committing on success.
macro_rules! transact {
    ($table:expr, $cancel:expr, |$txn:ident| $work:expr) => {{
        let txn = $table.database().begin($cancel).await?;
        let outcome = guarded($cancel, {
            let $txn: &dyn Transaction = txn.as_ref();
            $work
        })
        .await;
        finish(txn, outcome).await
    }};
}

#[async_trait]
impl<T: EntityTable> Repository for T {
    type Entity = T::Entity;
    type Filter = T::Filter;
    type Updater = T::Updater;

    const KIND: &'static str = <T as EntityTable>::KIND;

    async fn add(
        &self,
        cancel: &CancellationToken,
        models: &[T::Entity],
    ) -> Result<Vec<i64>, AppError> {
        if models.is_empty() {
            return Err(AppError::empty_input());
        }
        tracing::debug!(kind = T::KIND, count = models.len(), "Adding");
        transact!(self, cancel, |txn| add_in(self, txn, models))
    }

    async fn replace(
        &self,
        cancel: &CancellationToken,
        models: &[T::Entity],
    ) -> Result<(), AppError> {
        if models.is_empty() {
            return Err(AppError::empty_input());
        }
        tracing::debug!(kind = T::KIND, count = models.len(), "Replacing");
        transact!(self, cancel, |txn| replace_in(self, txn, models))
    }

    async fn upsert(
        &self,
        cancel: &CancellationToken,
        models: &[T::Entity],
    ) -> Result<Vec<i64>, AppError> {
        if models.is_empty() {
            return Err(AppError::empty_input());
        }
        tracing::debug!(kind = T::KIND, count = models.len(), "Upserting");
        transact!(self, cancel, |txn| upsert_in(self, txn, models))
    }

    async fn update(
        &self,
        cancel: &CancellationToken,
        models: &[T::Entity],
        updater: &T::Updater,
    ) -> Result<Vec<T::Entity>, AppError> {
        if models.is_empty() {
            return Err(AppError::empty_input());
        }
        require_updates::<T>(updater)?;
        tracing::debug!(kind = T::KIND, count = models.len(), "Updating");
        transact!(self, cancel, |txn| update_in(self, txn, models, updater))
    }

    async fn update_where(
        &self,
        cancel: &CancellationToken,
        filter: &T::Filter,
        updater: &T::Updater,
    ) -> Result<u64, AppError> {
        let updated = self.update_where_returning(cancel, filter, updater).await?;
        Ok(updated.len() as u64)
    }

    async fn update_where_returning(
        &self,
        cancel: &CancellationToken,
        filter: &T::Filter,
        updater: &T::Updater,
    ) -> Result<Vec<T::Entity>, AppError> {
        require_updates::<T>(updater)?;
        tracing::debug!(kind = T::KIND, "Updating by filter");
        transact!(self, cancel, |txn| update_where_in(self, txn, filter, updater))
    }

    async fn delete(
        &self,
        cancel: &CancellationToken,
        models: &[T::Entity],
    ) -> Result<(), AppError> {
        if models.is_empty() {
            return Err(AppError::empty_input());
        }
        tracing::debug!(kind = T::KIND, count = models.len(), "Deleting");
        transact!(self, cancel, |txn| delete_in(self, txn, models))
    }

    async fn delete_where(
        &self,
        cancel: &CancellationToken,
        filter: &T::Filter,
    ) -> Result<u64, AppError> {
        let deleted = self.delete_where_returning(cancel, filter).await?;
        Ok(deleted.len() as u64)
    }

    async fn delete_where_returning(
        &self,
        cancel: &CancellationToken,
        filter: &T::Filter,
    ) -> Result<Vec<T::Entity>, AppError> {
        tracing::debug!(kind = T::KIND, "Deleting by filter");
        transact!(self, cancel, |txn| delete_where_in(self, txn, filter))
    }

    async fn count_where(
        &self,
        cancel: &CancellationToken,
        filter: &T::Filter,
    ) -> Result<u64, AppError> {
        transact!(self, cancel, |txn| async move {
            let predicate = self.predicate(txn, filter).await?;
            count::<T>(txn, &predicate).await
        })
    }

    async fn count_all(&self, cancel: &CancellationToken) -> Result<u64, AppError> {
        transact!(self, cancel, |txn| count::<T>(txn, &Predicate::always()))
    }

    async fn does_exist(
        &self,
        cancel: &CancellationToken,
        model: &T::Entity,
    ) -> Result<bool, AppError> {
        let id = require_id::<T>(model)?;
        transact!(self, cancel, |txn| row_exists(txn, T::TABLE, id))
    }

    async fn does_exist_where(
        &self,
        cancel: &CancellationToken,
        filter: &T::Filter,
    ) -> Result<bool, AppError> {
        Ok(self.count_where(cancel, filter).await? > 0)
    }

    async fn get_where(
        &self,
        cancel: &CancellationToken,
        filter: &T::Filter,
    ) -> Result<Vec<T::Entity>, AppError> {
        let found = transact!(self, cancel, |txn| async move {
            let predicate = self.predicate(txn, filter).await?;
            select(self, txn, &predicate, None).await
        })?;
        if found.is_empty() {
            return Err(AppError::ineffective(AppError::EmptyResult));
        }
        Ok(found)
    }

    async fn get_first_where(
        &self,
        cancel: &CancellationToken,
        filter: &T::Filter,
    ) -> Result<T::Entity, AppError> {
        let found = transact!(self, cancel, |txn| async move {
            let predicate = self.predicate(txn, filter).await?;
            select(self, txn, &predicate, Some(1)).await
        })?;
        found
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ineffective(AppError::EmptyResult))
    }

    async fn get_all(&self, cancel: &CancellationToken) -> Result<Vec<T::Entity>, AppError> {
        transact!(self, cancel, |txn| select(self, txn, &Predicate::always(), None))
    }
}
