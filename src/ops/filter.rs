//! Filter algebra: "which rows" a call should match.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Inclusive bounds for `Between`/`NotBetween`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range<T> {
    pub start: T,
    pub end: T,
}

/// Two nested operations joined by `And`/`Or`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compound<T> {
    pub lhs: Box<FilterOperation<T>>,
    pub rhs: Box<FilterOperation<T>>,
}

/// A filter applied to one field of type `T`.
///
/// Serialized as `{"operator": "Equal", "operand": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operator", content = "operand")]
pub enum FilterOperation<T> {
    Equal(T),
    NotEqual(T),
    GreaterThan(T),
    GreaterThanOrEqual(T),
    LessThan(T),
    LessThanOrEqual(T),
    In(Vec<T>),
    NotIn(Vec<T>),
    Between(Range<T>),
    NotBetween(Range<T>),
    Like(T),
    NotLike(T),
    And(Compound<T>),
    Or(Compound<T>),
}

/// Operator tag of a [`FilterOperation`], without its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    NotIn,
    Between,
    NotBetween,
    Like,
    NotLike,
    And,
    Or,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FilterOperator {
    /// True for operators that exclude rows rather than select them.
    pub fn is_negative(self) -> bool {
        matches!(
            self,
            FilterOperator::NotEqual
                | FilterOperator::NotIn
                | FilterOperator::NotBetween
                | FilterOperator::NotLike
        )
    }
}

impl<T> FilterOperation<T> {
    pub fn operator(&self) -> FilterOperator {
        match self {
            FilterOperation::Equal(_) => FilterOperator::Equal,
            FilterOperation::NotEqual(_) => FilterOperator::NotEqual,
            FilterOperation::GreaterThan(_) => FilterOperator::GreaterThan,
            FilterOperation::GreaterThanOrEqual(_) => FilterOperator::GreaterThanOrEqual,
            FilterOperation::LessThan(_) => FilterOperator::LessThan,
            FilterOperation::LessThanOrEqual(_) => FilterOperator::LessThanOrEqual,
            FilterOperation::In(_) => FilterOperator::In,
            FilterOperation::NotIn(_) => FilterOperator::NotIn,
            FilterOperation::Between(_) => FilterOperator::Between,
            FilterOperation::NotBetween(_) => FilterOperator::NotBetween,
            FilterOperation::Like(_) => FilterOperator::Like,
            FilterOperation::NotLike(_) => FilterOperator::NotLike,
            FilterOperation::And(_) => FilterOperator::And,
            FilterOperation::Or(_) => FilterOperator::Or,
        }
    }

    pub fn between(start: T, end: T) -> Self {
        FilterOperation::Between(Range { start, end })
    }

    pub fn not_between(start: T, end: T) -> Self {
        FilterOperation::NotBetween(Range { start, end })
    }

    pub fn and(lhs: Self, rhs: Self) -> Self {
        FilterOperation::And(Compound {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        FilterOperation::Or(Compound {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// Every leaf operand, left to right.
    pub fn operands(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_operands(&mut out);
        out
    }

    fn collect_operands<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            FilterOperation::Equal(v)
            | FilterOperation::NotEqual(v)
            | FilterOperation::GreaterThan(v)
            | FilterOperation::GreaterThanOrEqual(v)
            | FilterOperation::LessThan(v)
            | FilterOperation::LessThanOrEqual(v)
            | FilterOperation::Like(v)
            | FilterOperation::NotLike(v) => out.push(v),
            FilterOperation::In(vs) | FilterOperation::NotIn(vs) => out.extend(vs.iter()),
            FilterOperation::Between(r) | FilterOperation::NotBetween(r) => {
                out.push(&r.start);
                out.push(&r.end);
            }
            FilterOperation::And(c) | FilterOperation::Or(c) => {
                c.lhs.collect_operands(out);
                c.rhs.collect_operands(out);
            }
        }
    }

    /// Re-maps every leaf operand, recursing through lists, ranges and
    /// compounds. Used where the domain type differs from the stored one.
    pub fn map<U, F>(self, f: F) -> FilterOperation<U>
    where
        F: Fn(T) -> U,
    {
        self.map_with(&f)
    }

    fn map_with<U, F>(self, f: &F) -> FilterOperation<U>
    where
        F: Fn(T) -> U,
    {
        match self {
            FilterOperation::Equal(v) => FilterOperation::Equal(f(v)),
            FilterOperation::NotEqual(v) => FilterOperation::NotEqual(f(v)),
            FilterOperation::GreaterThan(v) => FilterOperation::GreaterThan(f(v)),
            FilterOperation::GreaterThanOrEqual(v) => FilterOperation::GreaterThanOrEqual(f(v)),
            FilterOperation::LessThan(v) => FilterOperation::LessThan(f(v)),
            FilterOperation::LessThanOrEqual(v) => FilterOperation::LessThanOrEqual(f(v)),
            FilterOperation::In(vs) => FilterOperation::In(vs.into_iter().map(f).collect()),
            FilterOperation::NotIn(vs) => FilterOperation::NotIn(vs.into_iter().map(f).collect()),
            FilterOperation::Between(r) => FilterOperation::Between(Range {
                start: f(r.start),
                end: f(r.end),
            }),
            FilterOperation::NotBetween(r) => FilterOperation::NotBetween(Range {
                start: f(r.start),
                end: f(r.end),
            }),
            FilterOperation::Like(v) => FilterOperation::Like(f(v)),
            FilterOperation::NotLike(v) => FilterOperation::NotLike(f(v)),
            FilterOperation::And(c) => FilterOperation::And(Compound {
                lhs: Box::new(c.lhs.map_with(f)),
                rhs: Box::new(c.rhs.map_with(f)),
            }),
            FilterOperation::Or(c) => FilterOperation::Or(Compound {
                lhs: Box::new(c.lhs.map_with(f)),
                rhs: Box::new(c.rhs.map_with(f)),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_reaches_every_leaf() {
        let op = FilterOperation::or(
            FilterOperation::In(vec![1, 2]),
            FilterOperation::and(
                FilterOperation::between(3, 4),
                FilterOperation::NotEqual(5),
            ),
        );

        let mapped = op.map(|v| v * 10);
        assert_eq!(
            mapped,
            FilterOperation::or(
                FilterOperation::In(vec![10, 20]),
                FilterOperation::and(
                    FilterOperation::between(30, 40),
                    FilterOperation::NotEqual(50),
                ),
            )
        );
    }

    #[test]
    fn test_operands_in_order() {
        let op = FilterOperation::and(
            FilterOperation::not_between(1, 2),
            FilterOperation::or(FilterOperation::Equal(3), FilterOperation::NotIn(vec![4, 5])),
        );
        assert_eq!(op.operands(), vec![&1, &2, &3, &4, &5]);
    }

    #[test]
    fn test_map_changes_operand_type() {
        let op: FilterOperation<Option<&str>> = FilterOperation::Equal(None);
        let mapped = op.map(|v| v.map(str::len));
        assert_eq!(mapped, FilterOperation::Equal(None));
    }

    #[test]
    fn test_operator_tags() {
        assert_eq!(FilterOperation::Like("a%").operator(), FilterOperator::Like);
        assert_eq!(
            FilterOperation::not_between(1, 2).operator(),
            FilterOperator::NotBetween
        );
        assert!(FilterOperator::NotIn.is_negative());
        assert!(!FilterOperator::In.is_negative());
        assert_eq!(FilterOperator::GreaterThanOrEqual.to_string(), "GreaterThanOrEqual");
    }

    #[test]
    fn test_wire_format() {
        let op = FilterOperation::between(1, 9);
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"operator": "Between", "operand": {"start": 1, "end": 9}})
        );

        let parsed: FilterOperation<String> = serde_json::from_value(json!({
            "operator": "Or",
            "operand": {
                "lhs": {"operator": "Equal", "operand": "a"},
                "rhs": {"operator": "In", "operand": ["b", "c"]}
            }
        }))
        .unwrap();
        assert_eq!(
            parsed,
            FilterOperation::or(
                FilterOperation::Equal("a".to_string()),
                FilterOperation::In(vec!["b".to_string(), "c".to_string()]),
            )
        );
    }

    #[test]
    fn test_wire_format_rejects_wrong_operand_shape() {
        let parsed: Result<FilterOperation<i64>, _> =
            serde_json::from_value(json!({"operator": "Between", "operand": 3}));
        assert!(parsed.is_err());
    }
}
