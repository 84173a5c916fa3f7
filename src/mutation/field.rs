//! Per-type meaning of each update operator.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::ops::UpdateOperation;

/// A field type that update operations can be applied to.
pub trait Mutable: Sized {
    /// Applies `op` in place. `field` only names the field in errors.
    fn mutate(&mut self, field: &'static str, op: &UpdateOperation<Self>) -> Result<(), AppError>;
}

fn unsupported<T>(field: &str, op: &UpdateOperation<T>) -> AppError {
    AppError::InvalidUpdate(format!(
        "{} does not support {}",
        field,
        op.operator()
    ))
}

impl Mutable for String {
    fn mutate(&mut self, field: &'static str, op: &UpdateOperation<Self>) -> Result<(), AppError> {
        match op {
            UpdateOperation::Set(v) => *self = v.clone(),
            UpdateOperation::Clear => self.clear(),
            UpdateOperation::Append(v) => self.push_str(v),
            UpdateOperation::Prepend(v) => self.insert_str(0, v),
            _ => return Err(unsupported(field, op)),
        }
        Ok(())
    }
}

impl Mutable for Option<String> {
    fn mutate(&mut self, field: &'static str, op: &UpdateOperation<Self>) -> Result<(), AppError> {
        match op {
            UpdateOperation::Set(v) => *self = v.clone(),
            UpdateOperation::Clear => *self = None,
            // Appending nothing leaves the value alone, including a NULL one.
            UpdateOperation::Append(None) | UpdateOperation::Prepend(None) => {}
            UpdateOperation::Append(Some(v)) => self.get_or_insert_with(String::new).push_str(v),
            UpdateOperation::Prepend(Some(v)) => {
                self.get_or_insert_with(String::new).insert_str(0, v)
            }
            _ => return Err(unsupported(field, op)),
        }
        Ok(())
    }
}

impl Mutable for i64 {
    fn mutate(&mut self, field: &'static str, op: &UpdateOperation<Self>) -> Result<(), AppError> {
        match op {
            UpdateOperation::Set(v) => *self = *v,
            UpdateOperation::Clear => *self = 0,
            UpdateOperation::Increment(v) => {
                *self = self.checked_add(*v).ok_or_else(|| {
                    AppError::InvalidUpdate(format!("{} overflows on Increment", field))
                })?
            }
            UpdateOperation::Decrement(v) => {
                *self = self.checked_sub(*v).ok_or_else(|| {
                    AppError::InvalidUpdate(format!("{} overflows on Decrement", field))
                })?
            }
            _ => return Err(unsupported(field, op)),
        }
        Ok(())
    }
}

impl Mutable for bool {
    fn mutate(&mut self, field: &'static str, op: &UpdateOperation<Self>) -> Result<(), AppError> {
        match op {
            UpdateOperation::Set(v) => *self = *v,
            UpdateOperation::Clear => *self = false,
            _ => return Err(unsupported(field, op)),
        }
        Ok(())
    }
}

impl Mutable for DateTime<Utc> {
    fn mutate(&mut self, field: &'static str, op: &UpdateOperation<Self>) -> Result<(), AppError> {
        match op {
            UpdateOperation::Set(v) => *self = *v,
            _ => return Err(unsupported(field, op)),
        }
        Ok(())
    }
}

impl Mutable for Option<DateTime<Utc>> {
    fn mutate(&mut self, field: &'static str, op: &UpdateOperation<Self>) -> Result<(), AppError> {
        match op {
            UpdateOperation::Set(v) => *self = *v,
            UpdateOperation::Clear => *self = None,
            _ => return Err(unsupported(field, op)),
        }
        Ok(())
    }
}

impl<T: Clone> Mutable for Vec<T> {
    fn mutate(&mut self, field: &'static str, op: &UpdateOperation<Self>) -> Result<(), AppError> {
        match op {
            UpdateOperation::Set(v) => *self = v.clone(),
            UpdateOperation::Clear => self.clear(),
            UpdateOperation::Append(v) => self.extend(v.iter().cloned()),
            UpdateOperation::Prepend(v) => {
                let tail = std::mem::replace(self, v.clone());
                self.extend(tail);
            }
            _ => return Err(unsupported(field, op)),
        }
        Ok(())
    }
}

/// Sets are unordered, so `Append` and `Prepend` are both a union.
impl<T: Ord + Clone> Mutable for BTreeSet<T> {
    fn mutate(&mut self, field: &'static str, op: &UpdateOperation<Self>) -> Result<(), AppError> {
        match op {
            UpdateOperation::Set(v) => *self = v.clone(),
            UpdateOperation::Clear => self.clear(),
            UpdateOperation::Append(v) | UpdateOperation::Prepend(v) => {
                self.extend(v.iter().cloned())
            }
            _ => return Err(unsupported(field, op)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_operations() {
        let mut path = "path/to/a".to_string();
        path.mutate("path", &UpdateOperation::Prepend("new/".into()))
            .unwrap();
        assert_eq!(path, "new/path/to/a");
        path.mutate("path", &UpdateOperation::Append(".md".into()))
            .unwrap();
        assert_eq!(path, "new/path/to/a.md");
        path.mutate("path", &UpdateOperation::Clear).unwrap();
        assert_eq!(path, "");

        let err = path
            .mutate("path", &UpdateOperation::Increment("x".into()))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidUpdate(_)));
    }

    #[test]
    fn test_optional_string_append_starts_from_empty() {
        let mut title: Option<String> = None;
        title
            .mutate("title", &UpdateOperation::Append(Some("Rust".into())))
            .unwrap();
        assert_eq!(title.as_deref(), Some("Rust"));
        title
            .mutate("title", &UpdateOperation::Append(None))
            .unwrap();
        assert_eq!(title.as_deref(), Some("Rust"));
        title.mutate("title", &UpdateOperation::Clear).unwrap();
        assert_eq!(title, None);
    }

    #[test]
    fn test_integer_arithmetic_is_checked() {
        let mut n = 5i64;
        n.mutate("n", &UpdateOperation::Increment(3)).unwrap();
        n.mutate("n", &UpdateOperation::Decrement(10)).unwrap();
        assert_eq!(n, -2);

        let mut max = i64::MAX;
        let err = max
            .mutate("n", &UpdateOperation::Increment(1))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidUpdate(_)));
        assert_eq!(max, i64::MAX);
    }

    #[test]
    fn test_bool_rejects_arithmetic() {
        let mut flag = false;
        flag.mutate("is_read", &UpdateOperation::Set(true)).unwrap();
        assert!(flag);
        assert!(flag
            .mutate("is_read", &UpdateOperation::Increment(true))
            .is_err());
    }

    #[test]
    fn test_required_timestamp_cannot_be_cleared() {
        let mut at = Utc::now();
        let err = at.mutate("created_at", &UpdateOperation::Clear).unwrap_err();
        assert!(matches!(err, AppError::InvalidUpdate(_)));

        let mut deleted: Option<DateTime<Utc>> = Some(at);
        deleted.mutate("deleted_at", &UpdateOperation::Clear).unwrap();
        assert_eq!(deleted, None);
    }

    #[test]
    fn test_sequence_prepend_keeps_order() {
        let mut v = vec![3, 4];
        v.mutate("v", &UpdateOperation::Prepend(vec![1, 2])).unwrap();
        v.mutate("v", &UpdateOperation::Append(vec![5])).unwrap();
        assert_eq!(v, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_set_append_is_union() {
        let mut tags: BTreeSet<i64> = [1, 2].into();
        tags.mutate("tags", &UpdateOperation::Append([2, 3].into()))
            .unwrap();
        assert_eq!(tags, [1, 2, 3].into());
        assert!(tags
            .mutate("tags", &UpdateOperation::Decrement([1].into()))
            .is_err());
    }
}
