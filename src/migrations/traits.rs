//! Migration trait and registry.

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::convert::time;
use crate::db::{finish, Database, QueryExt, SqlExecutor as _, Transaction};
use crate::error::AppError;

/// A forward-only schema change.
///
/// Uses `BoxFuture` so `up` can borrow the executor for exactly as long as
/// the migration runs.
pub trait Migration: Send + Sync {
    fn id(&self) -> &'static str;
    fn version(&self) -> u32;
    fn description(&self) -> &'static str;
    fn up<'a>(&'a self, ctx: &'a dyn Transaction) -> BoxFuture<'a, Result<(), AppError>>;
}

/// Ordered set of migrations.
pub struct Register {
    migrations: Vec<Box<dyn Migration>>,
}

impl Register {
    pub fn new() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    pub fn register(mut self, migration: impl Migration + 'static) -> Self {
        self.migrations.push(Box::new(migration));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Migration> {
        self.migrations.iter().map(|m| m.as_ref())
    }

    /// Highest registered version.
    pub fn latest_version(&self) -> u32 {
        self.iter().map(|m| m.version()).max().unwrap_or(0)
    }

    /// Run all pending migrations above `current_version`.
    ///
    /// Each migration runs in its own transaction together with the row
    /// recording it, so a failed migration leaves no trace.
    /// Returns (new_version, applied_migration_ids).
    pub async fn run_pending(
        &self,
        db: &Database,
        current_version: u32,
    ) -> Result<(u32, Vec<String>), AppError> {
        let cancel = CancellationToken::new();
        let mut applied = vec![];
        let mut new_version = current_version;

        for migration in &self.migrations {
            if migration.version() <= current_version {
                continue;
            }

            tracing::info!(
                "Applying migration {} (v{}): {}",
                migration.id(),
                migration.version(),
                migration.description()
            );

            let txn = db.begin(&cancel).await?;
            let outcome = async {
                migration.up(txn.as_ref()).await?;
                txn.query(
                    "INSERT INTO schema_migrations (version, id, applied_at) VALUES (?, ?, ?)",
                )
                .bind(i64::from(migration.version()))
                .bind(migration.id())
                .bind(time::encode(&chrono::Utc::now()))
                .run()
                .await?;
                Ok::<_, AppError>(())
            }
            .await;

            if let Err(e) = &outcome {
                tracing::error!("Migration {} failed: {}", migration.id(), e);
            }
            finish(txn, outcome).await?;

            new_version = migration.version();
            applied.push(migration.id().to_string());
        }

        Ok((new_version, applied))
    }
}

impl Default for Register {
    fn default() -> Self {
        Self::new()
    }
}
