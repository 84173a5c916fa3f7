//! Compilation of filter structs into SQL predicates.
//!
//! Each filter field is bound to a [`Target`]: a plain column of the entity
//! table, or a [`Relation`] reached through a correlated subquery. Set
//! fields compile to [`Predicate`]s that are conjoined; an empty filter
//! matches every row.
//!
//! Placeholders are always `?`; the executor's dialect renumbers them.

mod compile;
mod entities;

pub use compile::{compile, PredicateBuilder, Relation, Target};
pub use entities::{bookmark_predicate, document_predicate, tag_predicate};

use crate::db::Params;

/// A boolean SQL expression with its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub sql: String,
    pub params: Params,
}

impl Predicate {
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Matches every row.
    pub fn always() -> Self {
        Self::new("1 = 1", Vec::new())
    }

    /// Matches no row.
    pub fn never() -> Self {
        Self::new("1 = 0", Vec::new())
    }

    pub fn is_always(&self) -> bool {
        self.sql == "1 = 1"
    }

    pub fn and(self, other: Predicate) -> Self {
        if self.is_always() {
            return other;
        }
        if other.is_always() {
            return self;
        }
        self.join("AND", other)
    }

    pub fn or(self, other: Predicate) -> Self {
        self.join("OR", other)
    }

    pub fn not(self) -> Self {
        Self::new(format!("NOT ({})", self.sql), self.params)
    }

    /// Conjunction of `parts`; [`Predicate::always`] when empty.
    pub fn all(parts: impl IntoIterator<Item = Predicate>) -> Self {
        parts.into_iter().fold(Self::always(), Self::and)
    }

    fn join(mut self, keyword: &str, other: Predicate) -> Self {
        self.params.extend(other.params);
        Self::new(format!("({} {} {})", self.sql, keyword, other.sql), self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlValue;

    #[test]
    fn test_all_of_nothing_matches_everything() {
        assert_eq!(Predicate::all(Vec::new()), Predicate::always());
    }

    #[test]
    fn test_and_keeps_parameter_order() {
        let a = Predicate::new("a = ?", vec![SqlValue::Integer(1)]);
        let b = Predicate::new("b = ?", vec![SqlValue::Integer(2)]);
        let joined = Predicate::all([a, b]);
        assert_eq!(joined.sql, "(a = ? AND b = ?)");
        assert_eq!(
            joined.params,
            vec![SqlValue::Integer(1), SqlValue::Integer(2)]
        );
    }

    #[test]
    fn test_not_wraps() {
        let p = Predicate::new("a IS NULL", vec![]).not();
        assert_eq!(p.sql, "NOT (a IS NULL)");
    }
}
