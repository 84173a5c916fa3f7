//! SQLite backend implementation.
//!
//! A single `rusqlite` connection shared behind a mutex. SQLite allows one
//! writer at a time anyway, so transactions are serialized by an async gate:
//! a [`SqliteTransaction`] owns the gate until it finishes, and auto-commit
//! statements on the client wait for it.
//!
//! # Example
//!
//! ```ignore
//! use pkm_store::db::backends::sqlite::SqliteClient;
//! use pkm_store::db::{Database, QueryExt};
//!
//! let db = Database::new(SqliteClient::open("pkm.db")?);
//! let rows = db.query("SELECT * FROM bookmarks").fetch_all().await?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ErrorCode};
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::db::dialect::Dialect;
use crate::db::row::{Params, Row, RowStream};
use crate::db::traits::{DbClient, SqlExecutor, Transaction};
use crate::db::value::SqlValue;
use crate::error::AppError;

impl rusqlite::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
        })
    }
}

/// Embedded SQLite client.
///
/// This type is cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct SqliteClient {
    conn: Arc<Mutex<Connection>>,
    gate: Arc<AsyncMutex<()>>,
}

impl SqliteClient {
    /// Opens (or creates) a database file.
    pub fn open(path: &str) -> Result<Self, AppError> {
        let conn = Connection::open(path)
            .map_err(|e| AppError::Database(format!("Failed to open {}: {}", path, e)))?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Database(format!("Failed to open in-memory database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, AppError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| AppError::Database(format!("Failed to enable foreign keys: {}", e)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            gate: Arc::new(AsyncMutex::new(())),
        })
    }
}

#[async_trait]
impl SqlExecutor for SqliteClient {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn query_sql(&self, sql: &str, params: Params) -> Result<RowStream<'_>, AppError> {
        let _gate = self.gate.lock().await;
        let rows = with_conn(&self.conn, |conn| query_rows(conn, sql, &params))?;
        Ok(Box::pin(futures::stream::iter(rows.into_iter().map(Ok))))
    }

    async fn execute_sql(&self, sql: &str, params: Params) -> Result<u64, AppError> {
        let _gate = self.gate.lock().await;
        with_conn(&self.conn, |conn| execute(conn, sql, &params))
    }

    async fn batch_sql(&self, sql: &str) -> Result<(), AppError> {
        let _gate = self.gate.lock().await;
        with_conn(&self.conn, |conn| batch(conn, sql))
    }
}

#[async_trait]
impl DbClient for SqliteClient {
    async fn begin(&self) -> Result<Box<dyn Transaction + '_>, AppError> {
        let gate = self.gate.clone().lock_owned().await;
        with_conn(&self.conn, |conn| batch(conn, "BEGIN"))?;

        Ok(Box::new(SqliteTransaction {
            conn: self.conn.clone(),
            _gate: gate,
            finished: false,
        }))
    }
}

/// An open SQLite transaction.
///
/// Holds the client's gate, so no other statement reaches the connection
/// until this finishes. Dropping it unfinished rolls back.
pub struct SqliteTransaction {
    conn: Arc<Mutex<Connection>>,
    _gate: OwnedMutexGuard<()>,
    finished: bool,
}

impl SqliteTransaction {
    fn end(&mut self, statement: &str) -> Result<(), AppError> {
        with_conn(&self.conn, |conn| batch(conn, statement))?;
        self.finished = true;
        Ok(())
    }
}

#[async_trait]
impl SqlExecutor for SqliteTransaction {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn query_sql(&self, sql: &str, params: Params) -> Result<RowStream<'_>, AppError> {
        let rows = with_conn(&self.conn, |conn| query_rows(conn, sql, &params))?;
        Ok(Box::pin(futures::stream::iter(rows.into_iter().map(Ok))))
    }

    async fn execute_sql(&self, sql: &str, params: Params) -> Result<u64, AppError> {
        with_conn(&self.conn, |conn| execute(conn, sql, &params))
    }

    async fn batch_sql(&self, sql: &str) -> Result<(), AppError> {
        with_conn(&self.conn, |conn| batch(conn, sql))
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn commit(&mut self) -> Result<(), AppError> {
        self.end("COMMIT")
    }

    async fn rollback(&mut self) -> Result<(), AppError> {
        self.end("ROLLBACK")
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!("SqliteTransaction dropped without commit or rollback, rolling back");
        if let Err(e) = with_conn(&self.conn, |conn| batch(conn, "ROLLBACK")) {
            tracing::error!(error = %e, "Failed to roll back abandoned transaction");
        }
    }
}

/// Runs `f` with the connection locked. The guard never crosses an await.
fn with_conn<R>(
    conn: &Mutex<Connection>,
    f: impl FnOnce(&Connection) -> Result<R, AppError>,
) -> Result<R, AppError> {
    let guard = conn
        .lock()
        .map_err(|_| AppError::Database("SQLite connection lock poisoned".into()))?;
    f(&guard)
}

fn query_rows(conn: &Connection, sql: &str, params: &Params) -> Result<Vec<Row>, AppError> {
    let mut stmt = conn.prepare(sql).map_err(|e| map_error(e, sql))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt
        .query(params_from_iter(params.iter()))
        .map_err(|e| map_error(e, sql))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| map_error(e, sql))? {
        let mut data = HashMap::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            let value = row.get_ref(idx).map_err(|e| map_error(e, sql))?;
            data.insert(name.clone(), to_json(value));
        }
        out.push(Row::new(data));
    }
    Ok(out)
}

fn execute(conn: &Connection, sql: &str, params: &Params) -> Result<u64, AppError> {
    conn.execute(sql, params_from_iter(params.iter()))
        .map(|affected| affected as u64)
        .map_err(|e| map_error(e, sql))
}

fn batch(conn: &Connection, sql: &str) -> Result<(), AppError> {
    conn.execute_batch(sql).map_err(|e| map_error(e, sql))
}

fn to_json(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(v) => JsonValue::Number(v.into()),
        ValueRef::Real(v) => serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            JsonValue::Array(bytes.iter().map(|b| JsonValue::Number((*b).into())).collect())
        }
    }
}

/// Maps constraint failures onto domain errors, everything else onto `Query`.
fn map_error(err: rusqlite::Error, sql: &str) -> AppError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            match failure.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return AppError::dangling("row", detail);
                }
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return AppError::DuplicateInsertion(detail);
                }
                _ => {}
            }
        }
    }

    AppError::Query {
        message: format!("SQLite statement failed: {}", err),
        query: sql.to_string(),
    }
}
