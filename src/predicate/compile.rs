//! Operator-by-operator compilation.

use crate::db::SqlValue;
use crate::error::AppError;
use crate::ops::{FilterOperation, FilterOperator};
use crate::predicate::Predicate;

/// A set-valued relation of the filtered entity.
///
/// Compiles to `EXISTS (SELECT 1 FROM {source} WHERE {correlation} AND ...)`
/// with the operand compared against `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Table and alias, e.g. `bookmark_tags bt_tags`.
    pub source: &'static str,
    /// Condition tying a source row to the outer entity row.
    pub correlation: &'static str,
    /// Expression the operand is compared against.
    pub value: &'static str,
}

/// Where a filter field's values live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Column(&'static str),
    Relation(Relation),
}

/// Compiles one field's operation against its target.
pub fn compile(target: &Target, op: &FilterOperation<SqlValue>) -> Result<Predicate, AppError> {
    match target {
        Target::Column(expr) => column(expr, op),
        Target::Relation(relation) => related(relation, op),
    }
}

/// Conjoins compiled fields; unset fields contribute nothing.
#[derive(Debug, Default)]
pub struct PredicateBuilder {
    parts: Vec<Predicate>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T>(mut self, target: Target, op: Option<&FilterOperation<T>>) -> Result<Self, AppError>
    where
        T: Clone + Into<SqlValue>,
    {
        if let Some(op) = op {
            let op: FilterOperation<SqlValue> = op.clone().map(Into::into);
            self.parts.push(compile(&target, &op)?);
        }
        Ok(self)
    }

    pub fn build(self) -> Predicate {
        Predicate::all(self.parts)
    }
}

fn non_null<'a>(op: FilterOperator, value: &'a SqlValue) -> Result<&'a SqlValue, AppError> {
    if value.is_null() {
        return Err(AppError::InvalidFilter(format!(
            "{} does not accept a null operand",
            op
        )));
    }
    Ok(value)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Splits a membership list into its non-null values and whether it holds NULL.
fn split_nulls(values: &[SqlValue]) -> (Vec<SqlValue>, bool) {
    let has_null = values.iter().any(SqlValue::is_null);
    let present = values.iter().filter(|v| !v.is_null()).cloned().collect();
    (present, has_null)
}

fn compare(expr: &str, sign: &str, op: FilterOperator, value: &SqlValue) -> Result<Predicate, AppError> {
    let value = non_null(op, value)?;
    Ok(Predicate::new(format!("{} {} ?", expr, sign), vec![value.clone()]))
}

/// Column semantics: NULL is a value of its own. Positive operators never
/// match NULL unless asked to; negative ones always include it.
fn column(expr: &str, op: &FilterOperation<SqlValue>) -> Result<Predicate, AppError> {
    let operator = op.operator();
    match op {
        FilterOperation::Equal(SqlValue::Null) => Ok(Predicate::new(format!("{} IS NULL", expr), vec![])),
        FilterOperation::Equal(v) => compare(expr, "=", operator, v),
        FilterOperation::NotEqual(SqlValue::Null) => {
            Ok(Predicate::new(format!("{} IS NOT NULL", expr), vec![]))
        }
        FilterOperation::NotEqual(v) => Ok(Predicate::new(
            format!("({e} <> ? OR {e} IS NULL)", e = expr),
            vec![v.clone()],
        )),
        FilterOperation::GreaterThan(v) => compare(expr, ">", operator, v),
        FilterOperation::GreaterThanOrEqual(v) => compare(expr, ">=", operator, v),
        FilterOperation::LessThan(v) => compare(expr, "<", operator, v),
        FilterOperation::LessThanOrEqual(v) => compare(expr, "<=", operator, v),
        FilterOperation::Like(v) => compare(expr, "LIKE", operator, v),
        FilterOperation::NotLike(v) => {
            let v = non_null(operator, v)?;
            Ok(Predicate::new(
                format!("({e} NOT LIKE ? OR {e} IS NULL)", e = expr),
                vec![v.clone()],
            ))
        }
        FilterOperation::Between(r) => {
            let start = non_null(operator, &r.start)?;
            let end = non_null(operator, &r.end)?;
            Ok(Predicate::new(
                format!("{} BETWEEN ? AND ?", expr),
                vec![start.clone(), end.clone()],
            ))
        }
        FilterOperation::NotBetween(r) => {
            let start = non_null(operator, &r.start)?;
            let end = non_null(operator, &r.end)?;
            Ok(Predicate::new(
                format!("({e} NOT BETWEEN ? AND ? OR {e} IS NULL)", e = expr),
                vec![start.clone(), end.clone()],
            ))
        }
        FilterOperation::In(values) => {
            if values.is_empty() {
                return Ok(Predicate::never());
            }
            let (present, has_null) = split_nulls(values);
            let mut matched = Vec::new();
            if !present.is_empty() {
                matched.push(Predicate::new(
                    format!("{} IN ({})", expr, placeholders(present.len())),
                    present,
                ));
            }
            if has_null {
                matched.push(Predicate::new(format!("{} IS NULL", expr), vec![]));
            }
            Ok(any(matched))
        }
        FilterOperation::NotIn(values) => {
            if values.is_empty() {
                return Ok(Predicate::always());
            }
            let (present, has_null) = split_nulls(values);
            let sql = match (present.is_empty(), has_null) {
                (true, _) => format!("{} IS NOT NULL", expr),
                // NOT IN already rejects NULL rows
                (false, true) => format!("{} NOT IN ({})", expr, placeholders(present.len())),
                (false, false) => format!(
                    "({e} NOT IN ({p}) OR {e} IS NULL)",
                    e = expr,
                    p = placeholders(present.len())
                ),
            };
            Ok(Predicate::new(sql, present))
        }
        FilterOperation::And(c) => Ok(column(expr, &c.lhs)?.and(column(expr, &c.rhs)?)),
        FilterOperation::Or(c) => Ok(column(expr, &c.lhs)?.or(column(expr, &c.rhs)?)),
    }
}

fn any(parts: Vec<Predicate>) -> Predicate {
    parts
        .into_iter()
        .reduce(Predicate::or)
        .unwrap_or_else(Predicate::never)
}

fn exists(relation: &Relation, condition: Option<Predicate>) -> Predicate {
    match condition {
        Some(condition) => Predicate::new(
            format!(
                "EXISTS (SELECT 1 FROM {} WHERE {} AND {})",
                relation.source, relation.correlation, condition.sql
            ),
            condition.params,
        ),
        None => Predicate::new(
            format!(
                "EXISTS (SELECT 1 FROM {} WHERE {})",
                relation.source, relation.correlation
            ),
            vec![],
        ),
    }
}

/// Relation semantics: a positive operator holds when some related row
/// matches, a negative one when none does. `NULL` stands for "no related
/// row at all".
fn related(relation: &Relation, op: &FilterOperation<SqlValue>) -> Result<Predicate, AppError> {
    let value = relation.value;
    match op {
        FilterOperation::Equal(SqlValue::Null) => Ok(exists(relation, None).not()),
        FilterOperation::NotEqual(SqlValue::Null) => Ok(exists(relation, None)),
        FilterOperation::Equal(_)
        | FilterOperation::GreaterThan(_)
        | FilterOperation::GreaterThanOrEqual(_)
        | FilterOperation::LessThan(_)
        | FilterOperation::LessThanOrEqual(_)
        | FilterOperation::Like(_)
        | FilterOperation::Between(_) => Ok(exists(relation, Some(column(value, op)?))),
        FilterOperation::NotEqual(v) => {
            related(relation, &FilterOperation::Equal(v.clone())).map(Predicate::not)
        }
        FilterOperation::NotLike(v) => {
            related(relation, &FilterOperation::Like(v.clone())).map(Predicate::not)
        }
        FilterOperation::NotBetween(r) => {
            related(relation, &FilterOperation::Between(r.clone())).map(Predicate::not)
        }
        FilterOperation::In(values) => {
            if values.is_empty() {
                return Ok(Predicate::never());
            }
            let (present, has_null) = split_nulls(values);
            let mut matched = Vec::new();
            if !present.is_empty() {
                matched.push(exists(
                    relation,
                    Some(Predicate::new(
                        format!("{} IN ({})", value, placeholders(present.len())),
                        present,
                    )),
                ));
            }
            if has_null {
                matched.push(exists(relation, None).not());
            }
            Ok(any(matched))
        }
        FilterOperation::NotIn(values) => {
            if values.is_empty() {
                return Ok(Predicate::always());
            }
            related(relation, &FilterOperation::In(values.clone())).map(Predicate::not)
        }
        FilterOperation::And(c) => Ok(related(relation, &c.lhs)?.and(related(relation, &c.rhs)?)),
        FilterOperation::Or(c) => Ok(related(relation, &c.lhs)?.or(related(relation, &c.rhs)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAGS: Relation = Relation {
        source: "bookmark_tags bt_tags",
        correlation: "bt_tags.bookmark_id = bm.id",
        value: "bt_tags.tag_id",
    };

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    fn col(op: FilterOperation<SqlValue>) -> Result<Predicate, AppError> {
        compile(&Target::Column("bm.title"), &op)
    }

    #[test]
    fn test_equal_null_is_is_null() {
        let p = col(FilterOperation::Equal(SqlValue::Null)).unwrap();
        assert_eq!(p.sql, "bm.title IS NULL");
        assert!(p.params.is_empty());
    }

    #[test]
    fn test_not_equal_includes_null() {
        let p = col(FilterOperation::NotEqual(text("a"))).unwrap();
        assert_eq!(p.sql, "(bm.title <> ? OR bm.title IS NULL)");
        assert_eq!(p.params, vec![text("a")]);

        let p = col(FilterOperation::NotEqual(SqlValue::Null)).unwrap();
        assert_eq!(p.sql, "bm.title IS NOT NULL");
    }

    #[test]
    fn test_ordering_rejects_null() {
        let err = col(FilterOperation::GreaterThan(SqlValue::Null)).unwrap_err();
        assert!(matches!(err, AppError::InvalidFilter(_)));
        assert!(col(FilterOperation::Like(SqlValue::Null)).is_err());
        assert!(col(FilterOperation::between(SqlValue::Null, text("z"))).is_err());
    }

    #[test]
    fn test_membership() {
        let p = col(FilterOperation::In(vec![text("a"), SqlValue::Null, text("b")])).unwrap();
        assert_eq!(p.sql, "(bm.title IN (?, ?) OR bm.title IS NULL)");
        assert_eq!(p.params, vec![text("a"), text("b")]);

        let p = col(FilterOperation::NotIn(vec![text("a")])).unwrap();
        assert_eq!(p.sql, "(bm.title NOT IN (?) OR bm.title IS NULL)");

        let p = col(FilterOperation::NotIn(vec![text("a"), SqlValue::Null])).unwrap();
        assert_eq!(p.sql, "bm.title NOT IN (?)");

        let p = col(FilterOperation::NotIn(vec![SqlValue::Null])).unwrap();
        assert_eq!(p.sql, "bm.title IS NOT NULL");
        assert!(p.params.is_empty());
    }

    #[test]
    fn test_empty_membership() {
        assert_eq!(col(FilterOperation::In(vec![])).unwrap(), Predicate::never());
        assert_eq!(col(FilterOperation::NotIn(vec![])).unwrap(), Predicate::always());
    }

    #[test]
    fn test_between_and_not_between() {
        let p = col(FilterOperation::between(text("a"), text("m"))).unwrap();
        assert_eq!(p.sql, "bm.title BETWEEN ? AND ?");
        assert_eq!(p.params, vec![text("a"), text("m")]);

        let p = col(FilterOperation::not_between(text("a"), text("m"))).unwrap();
        assert_eq!(p.sql, "(bm.title NOT BETWEEN ? AND ? OR bm.title IS NULL)");
    }

    #[test]
    fn test_compound_is_parenthesised() {
        let p = col(FilterOperation::or(
            FilterOperation::Like(text("a%")),
            FilterOperation::and(
                FilterOperation::GreaterThan(text("m")),
                FilterOperation::LessThan(text("p")),
            ),
        ))
        .unwrap();
        assert_eq!(
            p.sql,
            "(bm.title LIKE ? OR (bm.title > ? AND bm.title < ?))"
        );
        assert_eq!(p.params, vec![text("a%"), text("m"), text("p")]);
    }

    #[test]
    fn test_relation_positive_is_exists() {
        let p = compile(
            &Target::Relation(TAGS),
            &FilterOperation::Equal(SqlValue::Integer(3)),
        )
        .unwrap();
        assert_eq!(
            p.sql,
            "EXISTS (SELECT 1 FROM bookmark_tags bt_tags WHERE bt_tags.bookmark_id = bm.id AND bt_tags.tag_id = ?)"
        );
        assert_eq!(p.params, vec![SqlValue::Integer(3)]);
    }

    #[test]
    fn test_relation_negative_is_not_exists() {
        let p = compile(
            &Target::Relation(TAGS),
            &FilterOperation::NotEqual(SqlValue::Integer(3)),
        )
        .unwrap();
        assert!(p.sql.starts_with("NOT (EXISTS ("));
        assert!(!p.sql.contains("<>"));
    }

    #[test]
    fn test_relation_null_means_no_related_row() {
        let p = compile(&Target::Relation(TAGS), &FilterOperation::Equal(SqlValue::Null)).unwrap();
        assert_eq!(
            p.sql,
            "NOT (EXISTS (SELECT 1 FROM bookmark_tags bt_tags WHERE bt_tags.bookmark_id = bm.id))"
        );

        let p = compile(
            &Target::Relation(TAGS),
            &FilterOperation::In(vec![SqlValue::Integer(1), SqlValue::Null]),
        )
        .unwrap();
        assert_eq!(p.params, vec![SqlValue::Integer(1)]);
        assert!(p.sql.contains(" OR NOT (EXISTS"));
    }

    #[test]
    fn test_builder_skips_unset_fields() {
        let title: Option<&FilterOperation<Option<String>>> = None;
        let url = FilterOperation::Like("https://%".to_string());
        let p = PredicateBuilder::new()
            .field(Target::Column("bm.title"), title)
            .unwrap()
            .field(Target::Column("bm.url"), Some(&url))
            .unwrap()
            .build();
        assert_eq!(p.sql, "bm.url LIKE ?");
        assert_eq!(p.params, vec![text("https://%")]);
    }
}
