//! `Executor` over a rusqlite connection.
//!
//! SQLite accepts backtick-quoted identifiers and `?` placeholders, so the
//! statements Keel builds run unchanged. Each call prepares its statement and
//! drains the cursor before returning, so nothing outlives the call.

use std::sync::Arc;

use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use sea_query::Value;

use crate::error::BoxError;
use crate::executor::{Executor, InsertOutcome};
use crate::row::Row;
use crate::value::{is_null, untyped_null};

/// Implementation of `Executor` for `rusqlite::Connection`
pub struct SqliteExecutor {
    conn: Connection,
}

impl SqliteExecutor {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns the rusqlite error if the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Connection::open_in_memory().map(Self::new)
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consume the executor and return the underlying connection
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

fn to_sqlite(value: &Value) -> Result<SqliteValue, BoxError> {
    if is_null(value) {
        return Ok(SqliteValue::Null);
    }
    Ok(match value {
        Value::Bool(Some(b)) => SqliteValue::Integer(i64::from(*b)),
        Value::TinyInt(Some(v)) => SqliteValue::Integer(i64::from(*v)),
        Value::SmallInt(Some(v)) => SqliteValue::Integer(i64::from(*v)),
        Value::Int(Some(v)) => SqliteValue::Integer(i64::from(*v)),
        Value::BigInt(Some(v)) => SqliteValue::Integer(*v),
        Value::TinyUnsigned(Some(v)) => SqliteValue::Integer(i64::from(*v)),
        Value::SmallUnsigned(Some(v)) => SqliteValue::Integer(i64::from(*v)),
        Value::Unsigned(Some(v)) => SqliteValue::Integer(i64::from(*v)),
        Value::BigUnsigned(Some(v)) => SqliteValue::Integer(
            i64::try_from(*v).map_err(|_| format!("{v} does not fit in an SQLite INTEGER"))?,
        ),
        Value::Float(Some(v)) => SqliteValue::Real(f64::from(*v)),
        Value::Double(Some(v)) => SqliteValue::Real(*v),
        Value::String(Some(s)) => SqliteValue::Text(s.clone()),
        Value::Char(Some(c)) => SqliteValue::Text(c.to_string()),
        Value::Bytes(Some(b)) => SqliteValue::Blob(b.clone()),
        Value::Json(Some(doc)) => SqliteValue::Text(serde_json::to_string(&**doc)?),
        other => return Err(format!("unsupported parameter: {other:?}").into()),
    })
}

fn from_sqlite(value: ValueRef<'_>) -> Result<Value, BoxError> {
    Ok(match value {
        ValueRef::Null => untyped_null(),
        ValueRef::Integer(i) => Value::BigInt(Some(i)),
        ValueRef::Real(f) => Value::Double(Some(f)),
        ValueRef::Text(bytes) => Value::String(Some(std::str::from_utf8(bytes)?.to_string())),
        ValueRef::Blob(bytes) => Value::Bytes(Some(bytes.to_vec())),
    })
}

fn bind(params: &[Value]) -> Result<Vec<SqliteValue>, BoxError> {
    params.iter().map(to_sqlite).collect()
}

impl Executor for SqliteExecutor {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, BoxError> {
        let bound = bind(params)?;
        let mut statement = self.conn.prepare(sql)?;
        let changed = statement.execute(params_from_iter(bound.iter()))?;
        Ok(u64::try_from(changed)?)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, BoxError> {
        let bound = bind(params)?;
        let mut statement = self.conn.prepare(sql)?;
        let columns: Arc<[String]> = statement
            .column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>()
            .into();

        let mut cursor = statement.query(params_from_iter(bound.iter()))?;
        let mut rows = Vec::new();
        while let Some(raw) = cursor.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(from_sqlite(raw.get_ref(idx)?)?);
            }
            rows.push(Row::with_columns(Arc::clone(&columns), values));
        }
        Ok(rows)
    }

    fn execute_insert(&self, sql: &str, params: &[Value]) -> Result<InsertOutcome, BoxError> {
        let rows_affected = self.execute(sql, params)?;
        let rowid = self.conn.last_insert_rowid();
        Ok(InsertOutcome {
            rows_affected,
            last_insert_id: u64::try_from(rowid).ok().filter(|id| *id > 0),
        })
    }
}
