//! Update algebra: "how to mutate" a field.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A mutation applied to one field of type `T`.
///
/// Serialized as `{"operator": "Set", "operand": ...}`; `Clear` has no operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operator", content = "operand")]
pub enum UpdateOperation<T> {
    Set(T),
    Clear,
    Append(T),
    Prepend(T),
    Increment(T),
    Decrement(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateOperator {
    Set,
    Clear,
    Append,
    Prepend,
    Increment,
    Decrement,
}

impl fmt::Display for UpdateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl<T> UpdateOperation<T> {
    pub fn operator(&self) -> UpdateOperator {
        match self {
            UpdateOperation::Set(_) => UpdateOperator::Set,
            UpdateOperation::Clear => UpdateOperator::Clear,
            UpdateOperation::Append(_) => UpdateOperator::Append,
            UpdateOperation::Prepend(_) => UpdateOperator::Prepend,
            UpdateOperation::Increment(_) => UpdateOperator::Increment,
            UpdateOperation::Decrement(_) => UpdateOperator::Decrement,
        }
    }
}
