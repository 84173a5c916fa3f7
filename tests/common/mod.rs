//! Shared setup for the SQLite-backed integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use pkm_store::config::Config;
use pkm_store::context::Context;
use pkm_store::error::AppError;
use tokio_util::sync::CancellationToken;

/// Fresh in-memory store with the schema applied.
pub async fn context() -> Context {
    Context::connect(Config::default())
        .await
        .expect("in-memory store should open")
}

pub fn token() -> CancellationToken {
    CancellationToken::new()
}

/// Shared, ordered record of what hooks observed.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn assert_ineffective(err: &AppError, check: impl Fn(&AppError) -> bool) {
    let cause = err
        .ineffective_cause()
        .unwrap_or_else(|| panic!("expected IneffectiveOperation, got {err:?}"));
    assert!(check(cause), "unexpected cause: {cause:?}");
}
