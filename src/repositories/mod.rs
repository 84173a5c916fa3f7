//! Data access layer.
//!
//! One repository per entity kind, each holding the shared [`Database`]
//! handle and resolved through `#[derive(FromContext)]`. The per-entity
//! statements live in [`EntityTable`] implementations; the [`Repository`]
//! operations, with their validation and transaction handling, are shared.
//!
//! [`Database`]: crate::db::Database

mod bookmark;
mod document;
mod table;
mod tag;
mod traits;
mod types;

pub use bookmark::BookmarkRepository;
pub use document::DocumentRepository;
pub use table::EntityTable;
pub use tag::TagRepository;
pub use traits::Repository;
pub use types::{TypeRepository, TypedTable};
