//! Per-entity storage hooks shared by the generic repository flows.

use async_trait::async_trait;

use crate::db::{Database, Dialect, QueryExt, Row, SqlValue, Transaction};
use crate::error::AppError;
use crate::models::Identifiable;
use crate::mutation::Updater;
use crate::predicate::Predicate;

/// How one entity maps onto its tables.
///
/// Implementors describe only the entity-specific statements; the
/// transaction handling and validation in [`Repository`] come from a blanket
/// implementation over this trait.
///
/// [`Repository`]: crate::repositories::Repository
#[async_trait]
pub trait EntityTable: Send + Sync {
    type Entity: Identifiable + Clone + Send + Sync + 'static;
    type Filter: Send + Sync;
    type Updater: Updater<Self::Entity> + Send + Sync;

    /// Entity name used in errors and logs.
    const KIND: &'static str;
    const TABLE: &'static str;
    /// Alias the table is selected under, matching the predicate compiler.
    const ALIAS: &'static str;

    fn database(&self) -> &Database;

    /// Compiles `filter` after checking the references it names.
    async fn predicate(
        &self,
        txn: &dyn Transaction,
        filter: &Self::Filter,
    ) -> Result<Predicate, AppError>;

    /// Inserts the entity's own row and returns its id.
    async fn insert_row(&self, txn: &dyn Transaction, entity: &Self::Entity)
        -> Result<i64, AppError>;

    /// Overwrites the entity's own row.
    async fn update_row(&self, txn: &dyn Transaction, entity: &Self::Entity)
        -> Result<(), AppError>;

    /// Writes the junction rows of a saved entity. `fresh` entities have none
    /// yet; otherwise the old ones are replaced.
    async fn write_relations(
        &self,
        txn: &dyn Transaction,
        entity: &Self::Entity,
        fresh: bool,
    ) -> Result<(), AppError>;

    /// Hard-deletes rows together with their junction rows.
    async fn delete_rows(&self, txn: &dyn Transaction, ids: &[i64]) -> Result<u64, AppError>;

    async fn to_domain(&self, txn: &dyn Transaction, row: Row) -> Result<Self::Entity, AppError>;
}

pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Inserts a row and returns its id.
///
/// With `id == 0` the id column is left to storage. An explicit id on
/// PostgreSQL also advances the identity sequence past it.
pub(crate) async fn insert_record(
    txn: &dyn Transaction,
    table: &str,
    columns: &[&str],
    mut values: Vec<SqlValue>,
    id: i64,
) -> Result<i64, AppError> {
    let mut columns = columns.to_vec();
    if id != 0 {
        columns.insert(0, "id");
        values.insert(0, id.into());
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
        table,
        columns.join(", "),
        placeholders(columns.len())
    );
    let assigned: i64 = txn
        .query(&sql)
        .bind_all(values)
        .fetch_scalar("id")
        .await?
        .ok_or_else(|| AppError::Internal(format!("INSERT into {} returned no id", table)))?;

    if id != 0 && txn.dialect() == Dialect::Postgres {
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence('{t}', 'id'), (SELECT MAX(id) FROM {t}))",
            t = table
        );
        txn.query(&sql).fetch_one().await?;
    }

    Ok(assigned)
}

pub(crate) async fn update_record(
    txn: &dyn Transaction,
    table: &str,
    columns: &[&str],
    values: Vec<SqlValue>,
    id: i64,
) -> Result<u64, AppError> {
    let assignments = columns
        .iter()
        .map(|c| format!("{} = ?", c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {} SET {} WHERE id = ?", table, assignments);
    txn.query(&sql).bind_all(values).bind(id).run().await
}

pub(crate) async fn row_exists(
    txn: &dyn Transaction,
    table: &str,
    id: i64,
) -> Result<bool, AppError> {
    let sql = format!("SELECT id FROM {} WHERE id = ?", table);
    Ok(txn.query(&sql).bind(id).fetch_one().await?.is_some())
}

/// Deletes the junction rows in `table` whose `column` names one of `ids`.
pub(crate) async fn delete_junction(
    txn: &dyn Transaction,
    table: &str,
    column: &str,
    ids: &[i64],
) -> Result<u64, AppError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "DELETE FROM {} WHERE {} IN ({})",
        table,
        column,
        placeholders(ids.len())
    );
    txn.query(&sql).bind_all(ids.iter().copied()).run().await
}
