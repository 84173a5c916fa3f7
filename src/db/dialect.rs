//! SQL differences between the supported backends.
//!
//! Statements are written once with `?` placeholders and portable DDL, then
//! rendered per backend right before they reach the driver.

use std::borrow::Cow;

/// The SQL flavour spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
        }
    }

    /// Rewrites `?` placeholders into the backend's native form.
    ///
    /// Question marks inside single-quoted literals are left alone.
    pub fn render(self, sql: &str) -> Cow<'_, str> {
        match self {
            Dialect::Sqlite => Cow::Borrowed(sql),
            Dialect::Postgres => {
                if !sql.contains('?') {
                    return Cow::Borrowed(sql);
                }
                let mut out = String::with_capacity(sql.len() + 8);
                let mut in_literal = false;
                let mut index = 0;
                for ch in sql.chars() {
                    match ch {
                        '\'' => {
                            in_literal = !in_literal;
                            out.push(ch);
                        }
                        '?' if !in_literal => {
                            index += 1;
                            out.push('$');
                            out.push_str(&index.to_string());
                        }
                        _ => out.push(ch),
                    }
                }
                Cow::Owned(out)
            }
        }
    }

    /// Column type for surrogate primary keys that the database assigns.
    pub fn id_column(self) -> &'static str {
        match self {
            Dialect::Sqlite => "INTEGER PRIMARY KEY",
            Dialect::Postgres => "BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY",
        }
    }

    /// Column type for 64-bit integers and foreign keys.
    pub fn integer(self) -> &'static str {
        match self {
            Dialect::Sqlite => "INTEGER",
            Dialect::Postgres => "BIGINT",
        }
    }

    /// Expands `{id}` and `{int}` markers in a DDL template.
    pub fn ddl(self, template: &str) -> String {
        template
            .replace("{id}", self.id_column())
            .replace("{int}", self.integer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_keeps_placeholders() {
        let sql = "SELECT * FROM tags WHERE id = ? AND tag = ?";
        assert!(matches!(Dialect::Sqlite.render(sql), Cow::Borrowed(_)));
        assert_eq!(Dialect::Sqlite.render(sql), sql);
    }

    #[test]
    fn test_postgres_numbers_placeholders() {
        assert_eq!(
            Dialect::Postgres.render("UPDATE tags SET tag = ? WHERE id = ?"),
            "UPDATE tags SET tag = $1 WHERE id = $2"
        );
    }

    #[test]
    fn test_postgres_skips_quoted_question_marks() {
        assert_eq!(
            Dialect::Postgres.render("SELECT '?' AS q, 'it''s?' AS r WHERE id = ?"),
            "SELECT '?' AS q, 'it''s?' AS r WHERE id = $1"
        );
    }

    #[test]
    fn test_ddl_template() {
        let template = "CREATE TABLE t (id {id}, parent {int})";
        assert_eq!(
            Dialect::Sqlite.ddl(template),
            "CREATE TABLE t (id INTEGER PRIMARY KEY, parent INTEGER)"
        );
        assert_eq!(
            Dialect::Postgres.ddl(template),
            "CREATE TABLE t (id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY, parent BIGINT)"
        );
    }
}
