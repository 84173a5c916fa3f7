//! Application error types.

use thiserror::Error;

/// Boxed cause carried by hook failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Application-level errors for pkm-store.
#[derive(Error, Debug)]
pub enum AppError {
    // Outcome errors: the call was valid but changed or found nothing
    #[error("Ineffective operation: {inner}")]
    IneffectiveOperation {
        #[source]
        inner: Box<AppError>,
    },

    #[error("Input collection is empty")]
    EmptyInput,

    #[error("Query matched no rows")]
    EmptyResult,

    // Input errors
    #[error("Required input is missing: {0}")]
    NilInput(String),

    #[error("Reference to non-existent {dependency}: {reference}")]
    ReferenceToNonExistentDependency {
        dependency: String,
        reference: String,
    },

    #[error("Duplicate insertion: {0}")]
    DuplicateInsertion(String),

    #[error("No {kind} with primary key {key}")]
    NonExistentPrimaryData { kind: String, key: String },

    #[error("Invalid tag hierarchy for tag {tag_id}: {reason}")]
    InvalidTagHierarchy { tag_id: i64, reason: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    // Pipeline errors
    #[error("Hook execution failed: {inner}")]
    HookExecution {
        #[source]
        inner: BoxError,
    },

    #[error("Operation cancelled")]
    Cancelled,

    // Storage errors
    #[error("Stored data could not be converted: {0}")]
    Conversion(String),

    #[error("Query error: {message}")]
    Query { message: String, query: String },

    #[error("Database error: {0}")]
    Database(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wraps `inner` as "the call had no effect".
    pub fn ineffective(inner: AppError) -> Self {
        AppError::IneffectiveOperation {
            inner: Box::new(inner),
        }
    }

    /// Shorthand for `IneffectiveOperation(EmptyInput)`.
    pub fn empty_input() -> Self {
        Self::ineffective(AppError::EmptyInput)
    }

    /// Shorthand for `IneffectiveOperation(NonExistentPrimaryData)`.
    pub fn missing_primary(kind: &str, key: impl ToString) -> Self {
        Self::ineffective(AppError::NonExistentPrimaryData {
            kind: kind.to_string(),
            key: key.to_string(),
        })
    }

    pub fn dangling(dependency: &str, reference: impl ToString) -> Self {
        AppError::ReferenceToNonExistentDependency {
            dependency: dependency.to_string(),
            reference: reference.to_string(),
        }
    }

    /// Returns true for "nothing to do" outcomes that are not failures.
    pub fn is_ineffective(&self) -> bool {
        matches!(self, AppError::IneffectiveOperation { .. })
    }

    /// Returns the error wrapped by `IneffectiveOperation`, if any.
    pub fn ineffective_cause(&self) -> Option<&AppError> {
        match self {
            AppError::IneffectiveOperation { inner } => Some(inner),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_ineffective_wraps_cause() {
        let err = AppError::empty_input();
        assert!(err.is_ineffective());
        assert!(matches!(err.ineffective_cause(), Some(AppError::EmptyInput)));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_hook_error_exposes_inner() {
        let cause: BoxError = anyhow::anyhow!("quota exceeded").into();
        let err = AppError::HookExecution { inner: cause };
        let source = err.source().expect("hook error has a source");
        assert_eq!(source.to_string(), "quota exceeded");
    }

    #[test]
    fn test_missing_primary_message() {
        let err = AppError::missing_primary("bookmark", 42);
        assert_eq!(
            err.to_string(),
            "Ineffective operation: No bookmark with primary key 42"
        );
    }
}
