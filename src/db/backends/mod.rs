//! Backend implementations for the supported databases.
//!
//! Each backend implements the core traits from [`crate::db`]:
//!
//! - [`SqlExecutor`](crate::db::SqlExecutor) for both client and transaction
//! - [`Transaction`](crate::db::Transaction) for the transaction
//! - [`DbClient`](crate::db::DbClient) for the client
//!
//! | Backend | Module | Use |
//! |---------|--------|-----|
//! | SQLite | [`sqlite`] | Embedded store, default |
//! | PostgreSQL | [`postgres`] | Shared server |

pub mod postgres;
pub mod sqlite;
