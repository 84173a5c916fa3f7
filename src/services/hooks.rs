//! Hooks run around repository calls.
//!
//! A registration names the exact [`HookPoint`]s it fires at. For an
//! operation of kind X the manager runs every registration at `BeforeAny`
//! or `BeforeX` before the call and at `AfterAny` or `AfterX` after it, in
//! registration order, once per entity.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, BoxError};

// ============================================================================
// Hook points
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Before,
    After,
}

/// Operation kinds hooks distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Add,
    Select,
    Update,
    Delete,
    Upsert,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookPoint {
    BeforeAny,
    BeforeAdd,
    BeforeSelect,
    BeforeUpdate,
    BeforeDelete,
    BeforeUpsert,
    AfterAny,
    AfterAdd,
    AfterSelect,
    AfterUpdate,
    AfterDelete,
    AfterUpsert,
}

impl HookPoint {
    pub fn new(phase: Phase, operation: Operation) -> Self {
        match (phase, operation) {
            (Phase::Before, Operation::Add) => HookPoint::BeforeAdd,
            (Phase::Before, Operation::Select) => HookPoint::BeforeSelect,
            (Phase::Before, Operation::Update) => HookPoint::BeforeUpdate,
            (Phase::Before, Operation::Delete) => HookPoint::BeforeDelete,
            (Phase::Before, Operation::Upsert) => HookPoint::BeforeUpsert,
            (Phase::After, Operation::Add) => HookPoint::AfterAdd,
            (Phase::After, Operation::Select) => HookPoint::AfterSelect,
            (Phase::After, Operation::Update) => HookPoint::AfterUpdate,
            (Phase::After, Operation::Delete) => HookPoint::AfterDelete,
            (Phase::After, Operation::Upsert) => HookPoint::AfterUpsert,
        }
    }

    pub fn any(phase: Phase) -> Self {
        match phase {
            Phase::Before => HookPoint::BeforeAny,
            Phase::After => HookPoint::AfterAny,
        }
    }

    /// The two points that fire for `operation` in `phase`.
    pub fn matching(phase: Phase, operation: Operation) -> [HookPoint; 2] {
        [Self::any(phase), Self::new(phase, operation)]
    }

    pub fn phase(self) -> Phase {
        match self {
            HookPoint::BeforeAny
            | HookPoint::BeforeAdd
            | HookPoint::BeforeSelect
            | HookPoint::BeforeUpdate
            | HookPoint::BeforeDelete
            | HookPoint::BeforeUpsert => Phase::Before,
            _ => Phase::After,
        }
    }
}

// ============================================================================
// Hooks
// ============================================================================

/// Work run for each entity of a call.
///
/// Plain closures `Fn(&T) -> anyhow::Result<()>` are hooks too.
#[async_trait]
pub trait Hook<T: Send + Sync>: Send + Sync {
    async fn run(&self, cancel: &CancellationToken, entity: &T) -> Result<(), BoxError>;
}

#[async_trait]
impl<T, F> Hook<T> for F
where
    T: Send + Sync,
    F: Fn(&T) -> anyhow::Result<()> + Send + Sync,
{
    async fn run(&self, _cancel: &CancellationToken, entity: &T) -> Result<(), BoxError> {
        self(entity).map_err(Into::into)
    }
}

struct Registration<T: Send + Sync> {
    points: BTreeSet<HookPoint>,
    hook: Arc<dyn Hook<T>>,
}

/// Ordered hook registrations for one entity type.
pub struct Hooks<T: Send + Sync> {
    registrations: Vec<Registration<T>>,
}

impl<T: Send + Sync> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }
}

impl<T: Send + Sync> fmt::Debug for Hooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.registrations.iter().map(|r| &r.points))
            .finish()
    }
}

impl<T: Send + Sync> Hooks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hook` at every point in `points`.
    pub fn on(
        mut self,
        points: impl IntoIterator<Item = HookPoint>,
        hook: impl Hook<T> + 'static,
    ) -> Self {
        self.registrations.push(Registration {
            points: points.into_iter().collect(),
            hook: Arc::new(hook),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Runs the hooks matching `phase` and `operation` over `entities`.
    ///
    /// Stops at the first failure, reported as `HookExecution`. Cancellation
    /// is checked before every hook call.
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        phase: Phase,
        operation: Operation,
        entities: &[T],
    ) -> Result<(), AppError> {
        if entities.is_empty() {
            return Ok(());
        }

        let points = HookPoint::matching(phase, operation);
        for registration in &self.registrations {
            if !points.iter().any(|p| registration.points.contains(p)) {
                continue;
            }
            for entity in entities {
                if cancel.is_cancelled() {
                    return Err(AppError::Cancelled);
                }
                registration
                    .hook
                    .run(cancel, entity)
                    .await
                    .map_err(|inner| AppError::HookExecution { inner })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_matching_points() {
        assert_eq!(
            HookPoint::matching(Phase::After, Operation::Delete),
            [HookPoint::AfterAny, HookPoint::AfterDelete]
        );
        assert_eq!(HookPoint::BeforeUpsert.phase(), Phase::Before);
        assert_eq!(HookPoint::AfterSelect.phase(), Phase::After);
    }

    #[tokio::test]
    async fn test_registration_order_and_points() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = log.clone();
        let second = log.clone();
        let skipped = log.clone();

        let hooks = Hooks::<i64>::new()
            .on([HookPoint::BeforeAny], move |n: &i64| -> anyhow::Result<()> {
                first.lock().unwrap().push(format!("any:{}", n));
                Ok(())
            })
            .on(
                [HookPoint::BeforeAdd, HookPoint::AfterAdd],
                move |n: &i64| -> anyhow::Result<()> {
                    second.lock().unwrap().push(format!("add:{}", n));
                    Ok(())
                },
            )
            .on([HookPoint::BeforeDelete], move |n: &i64| -> anyhow::Result<()> {
                skipped.lock().unwrap().push(format!("delete:{}", n));
                Ok(())
            });

        let cancel = CancellationToken::new();
        hooks
            .execute(&cancel, Phase::Before, Operation::Add, &[1, 2])
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["any:1", "any:2", "add:1", "add:2"]
        );
    }

    #[tokio::test]
    async fn test_failure_is_wrapped_and_stops() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let hooks = Hooks::<i64>::new()
            .on([HookPoint::AfterAny], |_: &i64| -> anyhow::Result<()> {
                anyhow::bail!("rejected")
            })
            .on([HookPoint::AfterAny], move |_: &i64| -> anyhow::Result<()> {
                *counter.lock().unwrap() += 1;
                Ok(())
            });

        let err = hooks
            .execute(&CancellationToken::new(), Phase::After, Operation::Select, &[1])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::HookExecution { .. }));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_no_entities_is_noop() {
        let hooks = Hooks::<i64>::new().on([HookPoint::BeforeAny], |_: &i64| -> anyhow::Result<()> {
            anyhow::bail!("never")
        });
        hooks
            .execute(&CancellationToken::new(), Phase::Before, Operation::Add, &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_before_first_call() {
        let hooks = Hooks::<i64>::new().on([HookPoint::BeforeAny], |_: &i64| -> anyhow::Result<()> {
            Ok(())
        });
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = hooks
            .execute(&cancel, Phase::Before, Operation::Add, &[1])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }
}
