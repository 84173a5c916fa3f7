//! Query builder for fluent SQL statement construction.

use futures::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;

use crate::db::row::{Params, Row, RowStream};
use crate::db::traits::SqlExecutor;
use crate::db::value::SqlValue;
use crate::error::AppError;

/// A builder for constructing and executing SQL statements.
///
/// `Query` provides a fluent API for binding positional parameters and
/// executing statements against any [`SqlExecutor`], including trait objects.
///
/// # Example
///
/// ```ignore
/// let rows = Query::new(&db, "SELECT * FROM tags WHERE parent_tag = ?")
///     .bind(parent_id)
///     .fetch_all()
///     .await?;
/// ```
pub struct Query<'a, E: SqlExecutor + ?Sized> {
    executor: &'a E,
    sql: String,
    params: Params,
}

impl<'a, E: SqlExecutor + ?Sized> Query<'a, E> {
    pub fn new(executor: &'a E, sql: &str) -> Self {
        Self {
            executor,
            sql: sql.to_string(),
            params: Params::new(),
        }
    }

    /// Binds the next `?` placeholder.
    pub fn bind<T: Into<SqlValue>>(mut self, value: T) -> Self {
        self.params.push(value.into());
        self
    }

    /// Binds several placeholders in order.
    pub fn bind_all<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<SqlValue>,
    {
        self.params.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Executes the statement and returns a stream of rows.
    pub async fn execute(self) -> Result<RowStream<'a>, AppError> {
        self.executor.query_sql(&self.sql, self.params).await
    }

    /// Executes the statement and collects all rows into a vector.
    pub async fn fetch_all(self) -> Result<Vec<Row>, AppError> {
        self.execute().await?.try_collect().await
    }

    /// Executes the statement and decodes every row into `T`.
    pub async fn fetch_as<T: DeserializeOwned>(self) -> Result<Vec<T>, AppError> {
        self.fetch_all()
            .await?
            .iter()
            .map(Row::decode)
            .collect()
    }

    /// Executes the statement and returns the first row, if any.
    pub async fn fetch_one(self) -> Result<Option<Row>, AppError> {
        let mut stream = self.execute().await?;
        stream.next().await.transpose()
    }

    /// Executes the statement and reads `column` from the first row.
    pub async fn fetch_scalar<T: DeserializeOwned>(
        self,
        column: &str,
    ) -> Result<Option<T>, AppError> {
        match self.fetch_one().await? {
            Some(row) => row.get_opt(column),
            None => Ok(None),
        }
    }

    /// Executes the statement and returns the number of affected rows.
    pub async fn run(self) -> Result<u64, AppError> {
        self.executor.execute_sql(&self.sql, self.params).await
    }
}

/// Extension trait providing a convenient `query()` method.
///
/// Implemented for every [`SqlExecutor`], sized or not, so it works on
/// `Database`, `&dyn SqlExecutor` and boxed transactions alike.
pub trait QueryExt: SqlExecutor {
    /// Creates a new query builder for this executor.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use pkm_store::db::QueryExt;
    ///
    /// let count: Option<i64> = db.query("SELECT COUNT(*) AS count FROM tags")
    ///     .fetch_scalar("count")
    ///     .await?;
    /// ```
    fn query(&self, sql: &str) -> Query<'_, Self> {
        Query::new(self, sql)
    }
}

impl<E: SqlExecutor + ?Sized> QueryExt for E {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::dialect::Dialect;
    use serde_json::json;
    use std::collections::HashMap;

    struct MockExecutor {
        expected_sql: String,
        expected_params: Params,
        rows: Vec<Row>,
    }

    impl MockExecutor {
        fn new(sql: &str, params: Params) -> Self {
            Self {
                expected_sql: sql.to_string(),
                expected_params: params,
                rows: Vec::new(),
            }
        }
    }

    #[async_trait::async_trait]
    impl SqlExecutor for MockExecutor {
        fn dialect(&self) -> Dialect {
            Dialect::Sqlite
        }

        async fn query_sql(&self, sql: &str, params: Params) -> Result<RowStream<'_>, AppError> {
            assert_eq!(sql, self.expected_sql);
            assert_eq!(params, self.expected_params);
            Ok(Box::pin(futures::stream::iter(
                self.rows.clone().into_iter().map(Ok),
            )))
        }

        async fn execute_sql(&self, sql: &str, params: Params) -> Result<u64, AppError> {
            assert_eq!(sql, self.expected_sql);
            assert_eq!(params, self.expected_params);
            Ok(3)
        }

        async fn batch_sql(&self, _sql: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_query_no_params() {
        let executor = MockExecutor::new("SELECT * FROM tags", vec![]);
        let rows = executor.query("SELECT * FROM tags").fetch_all().await;
        assert!(rows.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_binds_in_order() {
        let executor = MockExecutor::new(
            "SELECT * FROM bookmarks WHERE url = ? AND is_read = ?",
            vec![SqlValue::Text("https://a".into()), SqlValue::Integer(1)],
        );

        let result = executor
            .query("SELECT * FROM bookmarks WHERE url = ? AND is_read = ?")
            .bind("https://a")
            .bind(true)
            .fetch_all()
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_query_run_returns_affected() {
        let executor = MockExecutor::new(
            "DELETE FROM tags WHERE id IN (?, ?)",
            vec![SqlValue::Integer(1), SqlValue::Integer(2)],
        );

        let affected = executor
            .query("DELETE FROM tags WHERE id IN (?, ?)")
            .bind_all([1i64, 2])
            .run()
            .await
            .unwrap();
        assert_eq!(affected, 3);
    }

    #[tokio::test]
    async fn test_fetch_scalar_reads_first_row() {
        let mut executor = MockExecutor::new("SELECT COUNT(*) AS count FROM tags", vec![]);
        executor.rows = vec![Row::new(HashMap::from([(
            "count".to_string(),
            json!(5),
        )]))];

        let count: Option<i64> = executor
            .query("SELECT COUNT(*) AS count FROM tags")
            .fetch_scalar("count")
            .await
            .unwrap();
        assert_eq!(count, Some(5));
    }

    #[tokio::test]
    async fn test_query_through_trait_object() {
        let executor = MockExecutor::new("SELECT 1", vec![]);
        let dynamic: &dyn SqlExecutor = &executor;
        assert!(dynamic.query("SELECT 1").fetch_one().await.unwrap().is_none());
    }
}
