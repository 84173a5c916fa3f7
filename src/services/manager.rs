//! Hook-running front end over a repository.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::convert::TypeRecord;
use crate::di::FromContext;
use crate::error::AppError;
use crate::models::Identifiable;
use crate::repositories::{
    BookmarkRepository, DocumentRepository, Repository, TagRepository, TypeRepository,
};
use crate::services::hooks::{Hooks, Operation, Phase};

/// Wraps every repository call in before/after hooks.
///
/// Before hooks see the input entities and can veto the call; after hooks
/// see what the repository produced (assigned ids, updated or fetched
/// entities). A failing hook is reported as `HookExecution`. The manager
/// keeps no entity state.
#[derive(FromContext, Clone)]
pub struct Manager<R: Repository> {
    repository: R,
    #[from_context(default)]
    hooks: Arc<Hooks<R::Entity>>,
}

pub type BookmarkManager = Manager<BookmarkRepository>;
pub type DocumentManager = Manager<DocumentRepository>;
pub type TagManager = Manager<TagRepository>;

impl<R: Repository> Manager<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            hooks: Arc::new(Hooks::new()),
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks<R::Entity>) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn hooks(&self) -> &Hooks<R::Entity> {
        &self.hooks
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    // ============================================================================
    // Pipeline steps
    // ============================================================================

    async fn run_hooks(
        &self,
        cancel: &CancellationToken,
        phase: Phase,
        operation: Operation,
        entities: &[R::Entity],
    ) -> Result<(), AppError> {
        self.hooks
            .execute(cancel, phase, operation, entities)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    kind = R::KIND,
                    ?phase,
                    %operation,
                    error = %e,
                    "Hook failed"
                );
            })
    }

    async fn before(
        &self,
        cancel: &CancellationToken,
        operation: Operation,
        entities: &[R::Entity],
    ) -> Result<(), AppError> {
        self.run_hooks(cancel, Phase::Before, operation, entities).await
    }

    async fn after(
        &self,
        cancel: &CancellationToken,
        operation: Operation,
        entities: &[R::Entity],
    ) -> Result<(), AppError> {
        self.run_hooks(cancel, Phase::After, operation, entities).await
    }

    /// Logs a failed repository call. "Nothing to do" outcomes only at debug.
    fn report<V>(&self, call: &'static str, result: Result<V, AppError>) -> Result<V, AppError> {
        if let Err(e) = &result {
            if e.is_ineffective() {
                tracing::debug!(kind = R::KIND, call, error = %e, "Repository call had no effect");
            } else {
                tracing::error!(kind = R::KIND, call, error = %e, "Repository call failed");
            }
        }
        result
    }

    fn with_ids(models: &[R::Entity], ids: &[i64]) -> Vec<R::Entity> {
        models
            .iter()
            .zip(ids)
            .map(|(model, id)| {
                let mut saved = model.clone();
                saved.set_id(*id);
                saved
            })
            .collect()
    }

    // ============================================================================
    // Repository operations
    // ============================================================================

    pub async fn add(
        &self,
        cancel: &CancellationToken,
        models: &[R::Entity],
    ) -> Result<Vec<i64>, AppError> {
        self.before(cancel, Operation::Add, models).await?;
        let ids = self.report("add", self.repository.add(cancel, models).await)?;
        self.after(cancel, Operation::Add, &Self::with_ids(models, &ids))
            .await?;
        Ok(ids)
    }

    pub async fn replace(
        &self,
        cancel: &CancellationToken,
        models: &[R::Entity],
    ) -> Result<(), AppError> {
        self.before(cancel, Operation::Update, models).await?;
        self.report("replace", self.repository.replace(cancel, models).await)?;
        self.after(cancel, Operation::Update, models).await
    }

    pub async fn upsert(
        &self,
        cancel: &CancellationToken,
        models: &[R::Entity],
    ) -> Result<Vec<i64>, AppError> {
        self.before(cancel, Operation::Upsert, models).await?;
        let ids = self.report("upsert", self.repository.upsert(cancel, models).await)?;
        self.after(cancel, Operation::Upsert, &Self::with_ids(models, &ids))
            .await?;
        Ok(ids)
    }

    pub async fn update(
        &self,
        cancel: &CancellationToken,
        models: &[R::Entity],
        updater: &R::Updater,
    ) -> Result<Vec<R::Entity>, AppError> {
        self.before(cancel, Operation::Update, models).await?;
        let updated = self.report(
            "update",
            self.repository.update(cancel, models, updater).await,
        )?;
        self.after(cancel, Operation::Update, &updated).await?;
        Ok(updated)
    }

    /// Before hooks have no input entities here; after hooks see every
    /// updated entity.
    pub async fn update_where(
        &self,
        cancel: &CancellationToken,
        filter: &R::Filter,
        updater: &R::Updater,
    ) -> Result<u64, AppError> {
        let updated = self.report(
            "update_where",
            self.repository
                .update_where_returning(cancel, filter, updater)
                .await,
        )?;
        self.after(cancel, Operation::Update, &updated).await?;
        Ok(updated.len() as u64)
    }

    pub async fn delete(
        &self,
        cancel: &CancellationToken,
        models: &[R::Entity],
    ) -> Result<(), AppError> {
        self.before(cancel, Operation::Delete, models).await?;
        self.report("delete", self.repository.delete(cancel, models).await)?;
        self.after(cancel, Operation::Delete, models).await
    }

    /// After hooks see the deleted entities as they were.
    pub async fn delete_where(
        &self,
        cancel: &CancellationToken,
        filter: &R::Filter,
    ) -> Result<u64, AppError> {
        let deleted = self.report(
            "delete_where",
            self.repository.delete_where_returning(cancel, filter).await,
        )?;
        self.after(cancel, Operation::Delete, &deleted).await?;
        Ok(deleted.len() as u64)
    }

    pub async fn count_where(
        &self,
        cancel: &CancellationToken,
        filter: &R::Filter,
    ) -> Result<u64, AppError> {
        self.report(
            "count_where",
            self.repository.count_where(cancel, filter).await,
        )
    }

    pub async fn count_all(&self, cancel: &CancellationToken) -> Result<u64, AppError> {
        self.report("count_all", self.repository.count_all(cancel).await)
    }

    pub async fn does_exist(
        &self,
        cancel: &CancellationToken,
        model: &R::Entity,
    ) -> Result<bool, AppError> {
        let models = std::slice::from_ref(model);
        self.before(cancel, Operation::Select, models).await?;
        let exists = self.report("does_exist", self.repository.does_exist(cancel, model).await)?;
        self.after(cancel, Operation::Select, models).await?;
        Ok(exists)
    }

    pub async fn does_exist_where(
        &self,
        cancel: &CancellationToken,
        filter: &R::Filter,
    ) -> Result<bool, AppError> {
        self.report(
            "does_exist_where",
            self.repository.does_exist_where(cancel, filter).await,
        )
    }

    pub async fn get_where(
        &self,
        cancel: &CancellationToken,
        filter: &R::Filter,
    ) -> Result<Vec<R::Entity>, AppError> {
        let found = self.report("get_where", self.repository.get_where(cancel, filter).await)?;
        self.after(cancel, Operation::Select, &found).await?;
        Ok(found)
    }

    pub async fn get_first_where(
        &self,
        cancel: &CancellationToken,
        filter: &R::Filter,
    ) -> Result<R::Entity, AppError> {
        let found = self.report(
            "get_first_where",
            self.repository.get_first_where(cancel, filter).await,
        )?;
        self.after(cancel, Operation::Select, std::slice::from_ref(&found))
            .await?;
        Ok(found)
    }

    pub async fn get_all(&self, cancel: &CancellationToken) -> Result<Vec<R::Entity>, AppError> {
        let found = self.report("get_all", self.repository.get_all(cancel).await)?;
        self.after(cancel, Operation::Select, &found).await?;
        Ok(found)
    }
}

// ============================================================================
// Type taxonomy pass-through
// ============================================================================

impl<R: Repository + TypeRepository> Manager<R> {
    pub async fn add_types(
        &self,
        cancel: &CancellationToken,
        types: &[String],
    ) -> Result<Vec<i64>, AppError> {
        self.report("add_types", self.repository.add_types(cancel, types).await)
    }

    pub async fn delete_types(
        &self,
        cancel: &CancellationToken,
        types: &[String],
    ) -> Result<(), AppError> {
        self.report(
            "delete_types",
            self.repository.delete_types(cancel, types).await,
        )
    }

    pub async fn update_type(
        &self,
        cancel: &CancellationToken,
        old: &str,
        new: &str,
    ) -> Result<(), AppError> {
        self.report(
            "update_type",
            self.repository.update_type(cancel, old, new).await,
        )
    }

    pub async fn get_types(&self, cancel: &CancellationToken) -> Result<Vec<TypeRecord>, AppError> {
        self.report("get_types", self.repository.get_types(cancel).await)
    }
}
