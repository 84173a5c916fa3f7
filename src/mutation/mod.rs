//! In-memory application of update operations.
//!
//! [`Mutable`] defines what each operator means for a field type;
//! [`Updater`] walks an updater struct and applies its set fields to an
//! entity in declaration order.

mod field;
mod updater;

pub use field::Mutable;
pub use updater::Updater;
