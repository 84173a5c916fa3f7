//! Migration runner with version tracking.

use crate::db::{Database, QueryExt, SqlExecutor};
use crate::error::AppError;
use crate::migrations::create_register;

/// Result of running migrations.
#[derive(Debug, Clone)]
pub struct MigrationResult {
    /// Schema version before migrations ran.
    pub previous_version: u32,
    /// Schema version after migrations ran.
    pub current_version: u32,
    /// IDs of the migrations applied by this run, in order.
    pub applied_migrations: Vec<String>,
}

/// Run all pending migrations.
///
/// Safe to call on every start; an up-to-date database applies nothing.
pub async fn run_migrations(db: &Database) -> Result<MigrationResult, AppError> {
    ensure_version_table(db).await?;

    let previous_version = schema_version(db).await?;
    let register = create_register();
    let (current_version, applied) = register.run_pending(db, previous_version).await?;

    Ok(MigrationResult {
        previous_version,
        current_version,
        applied_migrations: applied,
    })
}

const CREATE_SCHEMA_MIGRATIONS: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version {int} PRIMARY KEY,
    id TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

async fn ensure_version_table(db: &Database) -> Result<(), AppError> {
    db.batch_sql(&db.dialect().ddl(CREATE_SCHEMA_MIGRATIONS))
        .await
}

/// Highest applied migration version, 0 for a fresh database.
pub async fn schema_version(db: &Database) -> Result<u32, AppError> {
    let version: Option<i64> = db
        .query("SELECT COALESCE(MAX(version), 0) AS version FROM schema_migrations")
        .fetch_scalar("version")
        .await?;

    u32::try_from(version.unwrap_or(0))
        .map_err(|_| AppError::Conversion("schema version out of range".into()))
}
