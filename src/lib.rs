//! pkm-store - persistence layer for a personal knowledge manager
//!
//! Bookmarks, documents and hierarchical tags stored in SQLite or PostgreSQL,
//! with filter/update algebras, repositories and hook-running managers.

pub mod config;
pub mod context;
pub mod convert;
pub mod db;
pub mod di;
pub mod error;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod mutation;
pub mod ops;
pub mod predicate;
pub mod repositories;
pub mod services;

// Re-export FromRef at crate root for di-macros generated code
pub use di::FromRef;
