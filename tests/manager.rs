//! Hook pipeline around repository calls.

mod common;

use async_trait::async_trait;
use common::{context, entries, log, token, Log};
use pkm_store::error::{AppError, BoxError};
use pkm_store::models::{Document, DocumentFilter, DocumentUpdater, Tag};
use pkm_store::ops::{FilterOperation, UpdateOperation};
use pkm_store::services::{DocumentManager, Hook, HookPoint, Hooks, TagManager};
use pkm_store::FromRef;
use tokio_util::sync::CancellationToken;

fn record(
    log: &Log,
    label: &'static str,
) -> impl Fn(&Document) -> anyhow::Result<()> + Send + Sync + 'static {
    let log = log.clone();
    move |doc: &Document| {
        log.lock()
            .unwrap()
            .push(format!("{label}:{}:{}", doc.id, doc.path));
        Ok(())
    }
}

fn manager_with(ctx: &pkm_store::context::Context, hooks: Hooks<Document>) -> DocumentManager {
    DocumentManager::from_ref(ctx).with_hooks(hooks)
}

#[tokio::test]
async fn test_add_runs_hooks_in_order() {
    let ctx = context().await;
    let cancel = token();
    let log = log();
    let hooks = Hooks::new()
        .on([HookPoint::BeforeAny], record(&log, "before_any"))
        .on([HookPoint::BeforeAdd], record(&log, "before_add"))
        .on([HookPoint::AfterAdd], record(&log, "after_add"))
        .on([HookPoint::AfterAny], record(&log, "after_any"))
        .on([HookPoint::BeforeDelete], record(&log, "before_delete"));
    let manager = manager_with(&ctx, hooks);

    let ids = manager
        .add(&cancel, &[Document::new("a.md")])
        .await
        .unwrap();

    // before hooks see the unsaved model, after hooks the assigned id
    assert_eq!(
        entries(&log),
        vec![
            "before_any:0:a.md".to_string(),
            "before_add:0:a.md".to_string(),
            format!("after_add:{}:a.md", ids[0]),
            format!("after_any:{}:a.md", ids[0]),
        ]
    );
}

#[tokio::test]
async fn test_hooks_run_once_per_entity() {
    let ctx = context().await;
    let cancel = token();
    let log = log();
    let hooks = Hooks::new().on([HookPoint::BeforeAdd], record(&log, "before_add"));
    let manager = manager_with(&ctx, hooks);

    manager
        .add(&cancel, &[Document::new("a.md"), Document::new("b.md")])
        .await
        .unwrap();

    assert_eq!(
        entries(&log),
        vec!["before_add:0:a.md", "before_add:0:b.md"]
    );
}

#[tokio::test]
async fn test_failing_before_hook_skips_repository() {
    let ctx = context().await;
    let cancel = token();
    let log = log();
    let hooks = Hooks::new()
        .on([HookPoint::BeforeAdd], |doc: &Document| -> anyhow::Result<()> {
            anyhow::bail!("{} is not allowed", doc.path)
        })
        .on([HookPoint::AfterAdd], record(&log, "after_add"));
    let manager = manager_with(&ctx, hooks);

    let err = manager
        .add(&cancel, &[Document::new("forbidden.md")])
        .await
        .unwrap_err();

    match err {
        AppError::HookExecution { inner } => {
            assert_eq!(inner.to_string(), "forbidden.md is not allowed")
        }
        other => panic!("expected HookExecution, got {other:?}"),
    }
    assert!(entries(&log).is_empty());
    assert_eq!(manager.count_all(&cancel).await.unwrap(), 0);
}

#[tokio::test]
async fn test_failing_after_hook_reports_but_keeps_write() {
    let ctx = context().await;
    let cancel = token();
    let hooks = Hooks::new().on(
        [HookPoint::AfterAdd],
        |_: &Document| -> anyhow::Result<()> { anyhow::bail!("notify failed") },
    );
    let manager = manager_with(&ctx, hooks);

    let err = manager
        .add(&cancel, &[Document::new("a.md")])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::HookExecution { .. }));
    assert_eq!(manager.count_all(&cancel).await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_where_after_hooks_see_updated_entities() {
    let ctx = context().await;
    let cancel = token();
    let log = log();
    let hooks = Hooks::new()
        .on([HookPoint::BeforeUpdate], record(&log, "before_update"))
        .on([HookPoint::AfterUpdate], record(&log, "after_update"));
    let manager = manager_with(&ctx, hooks);
    let ids = manager
        .add(
            &cancel,
            &[Document::new("path/to/file"), Document::new("path/to/other/file")],
        )
        .await
        .unwrap();

    let filter = DocumentFilter {
        path: Some(FilterOperation::Like("path/to/%".into())),
        ..Default::default()
    };
    let updater = DocumentUpdater {
        path: Some(UpdateOperation::Prepend("new/".into())),
        ..Default::default()
    };
    let affected = manager
        .update_where(&cancel, &filter, &updater)
        .await
        .unwrap();

    assert_eq!(affected, 2);
    assert_eq!(
        entries(&log),
        vec![
            format!("after_update:{}:new/path/to/file", ids[0]),
            format!("after_update:{}:new/path/to/other/file", ids[1]),
        ]
    );
}

#[tokio::test]
async fn test_delete_where_after_hooks_see_deleted_entities() {
    let ctx = context().await;
    let cancel = token();
    let log = log();
    let hooks = Hooks::new().on([HookPoint::AfterDelete], record(&log, "after_delete"));
    let manager = manager_with(&ctx, hooks);
    let ids = manager
        .add(&cancel, &[Document::new("a.md"), Document::new("b.md")])
        .await
        .unwrap();

    let deleted = manager
        .delete_where(&cancel, &DocumentFilter::default())
        .await
        .unwrap();

    assert_eq!(deleted, 2);
    assert_eq!(
        entries(&log),
        vec![
            format!("after_delete:{}:a.md", ids[0]),
            format!("after_delete:{}:b.md", ids[1]),
        ]
    );
    assert_eq!(manager.count_all(&cancel).await.unwrap(), 0);
}

#[tokio::test]
async fn test_select_hooks_see_fetched_entities() {
    let ctx = context().await;
    let cancel = token();
    let log = log();
    let hooks = Hooks::new().on([HookPoint::AfterSelect], record(&log, "after_select"));
    let manager = manager_with(&ctx, hooks);
    let ids = manager
        .add(&cancel, &[Document::new("a.md")])
        .await
        .unwrap();

    let found = manager.get_all(&cancel).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(
        entries(&log),
        vec![format!("after_select:{}:a.md", ids[0])]
    );

    // counting does not fetch entities
    manager
        .count_where(&cancel, &DocumentFilter::default())
        .await
        .unwrap();
    assert_eq!(entries(&log).len(), 1);
}

#[tokio::test]
async fn test_ineffective_outcome_passes_through() {
    let ctx = context().await;
    let cancel = token();
    let log = log();
    let hooks = Hooks::new().on([HookPoint::AfterSelect], record(&log, "after_select"));
    let manager = manager_with(&ctx, hooks);

    let err = manager
        .get_where(&cancel, &DocumentFilter::default())
        .await
        .unwrap_err();
    assert!(err.is_ineffective());
    assert!(entries(&log).is_empty());

    let err = manager.add(&cancel, &[]).await.unwrap_err();
    assert!(matches!(err.ineffective_cause(), Some(AppError::EmptyInput)));
}

struct Cancelling {
    cancel: CancellationToken,
}

#[async_trait]
impl Hook<Tag> for Cancelling {
    async fn run(&self, _cancel: &CancellationToken, _tag: &Tag) -> Result<(), BoxError> {
        self.cancel.cancel();
        Ok(())
    }
}

#[tokio::test]
async fn test_cancellation_between_hooks() {
    let ctx = context().await;
    let cancel = token();
    let hooks = Hooks::new().on(
        [HookPoint::BeforeAdd],
        Cancelling {
            cancel: cancel.clone(),
        },
    );
    let manager = TagManager::from_ref(&ctx).with_hooks(hooks);

    let err = manager
        .add(&cancel, &[Tag::new("one"), Tag::new("two")])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Cancelled), "{err:?}");
    assert_eq!(manager.count_all(&token()).await.unwrap(), 0);
}
