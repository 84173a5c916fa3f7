//! Schema migrations with version tracking.
//!
//! Migrations are:
//! - **Forward-only**: no rollback support, add a compensating migration instead
//! - **Atomic**: each one runs in a transaction with its `schema_migrations` row
//! - **Portable**: DDL is written once and typed through the backend's `Dialect`
//! - **Auto-applied**: [`Context::connect`](crate::context::Context::connect) runs them

mod m001_schema;
mod m002_indexes;
mod runner;
mod traits;

pub use m001_schema::M001Schema;
pub use m002_indexes::M002Indexes;
pub use runner::{run_migrations, schema_version, MigrationResult};
pub use traits::{Migration, Register};

/// All migrations in version order.
pub fn create_register() -> Register {
    Register::new().register(M001Schema).register(M002Indexes)
}
