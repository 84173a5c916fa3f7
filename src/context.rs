//! Application context providing the dependency injection root.

use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::di::Context as ContextDerive;
use crate::error::AppError;
use crate::migrations::run_migrations;

/// Root application context.
///
/// `#[derive(Context)]` generates a `FromRef` impl per field, so
/// repositories and managers resolve their dependencies from it.
#[derive(ContextDerive, Clone)]
pub struct Context {
    /// Shared database handle.
    pub db: Database,
    /// Application configuration.
    pub config: Arc<Config>,
}

impl Context {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Opens the configured backend and brings its schema up to date.
    pub async fn connect(config: Config) -> Result<Self, AppError> {
        let db = Database::connect(&config.database).await?;
        let result = run_migrations(&db).await?;
        if !result.applied_migrations.is_empty() {
            tracing::info!(
                from = result.previous_version,
                to = result.current_version,
                "Applied migrations: {:?}",
                result.applied_migrations
            );
        }
        Ok(Self::new(db, config))
    }
}
