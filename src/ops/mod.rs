//! Typed filter and update operations.
//!
//! Each operator variant carries exactly the operand shape it needs, so a
//! `Between` with a scalar, or an `In` with a range, cannot be built.

mod filter;
mod update;

pub use filter::{Compound, FilterOperation, FilterOperator, Range};
pub use update::{UpdateOperation, UpdateOperator};
