//! Services over the repositories.
//!
//! The [`Manager`] is the intended entry point for callers: it runs the
//! registered [`Hooks`] around each repository call and logs failures.

mod hooks;
mod manager;

pub use hooks::{Hook, HookPoint, Hooks, Operation, Phase};
pub use manager::{BookmarkManager, DocumentManager, Manager, TagManager};
