//! The `Executor` trait: Keel's only view of a database connection.
//!
//! Keel produces SQL text with positional `?` placeholders plus an ordered
//! parameter list, and hands both to an executor. The executor owns the
//! connection (or transaction); Keel never issues BEGIN/COMMIT.
//!
//! Every statement Keel runs goes through [`run_execute`], [`run_query`] or
//! [`run_insert`], which add logging, timing, metrics and a tracing span, and
//! wrap executor failures in [`KeelError::Execution`].

use std::time::Instant;

use sea_query::Value;

use crate::config;
use crate::error::{BoxError, KeelError, Result};
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
use crate::query::Query;
use crate::row::Row;

/// Result of an INSERT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertOutcome {
    pub rows_affected: u64,
    /// Identity generated by the database, when the executor can report it
    pub last_insert_id: Option<u64>,
}

/// Trait for executing database operations
///
/// Implementations bind `params` to the `?` placeholders of `sql` in order.
///
/// # Examples
///
/// ```no_run
/// use keel::{Executor, SqliteExecutor, Value};
///
/// # fn main() -> Result<(), keel::BoxError> {
/// let executor = SqliteExecutor::open_in_memory()?;
/// executor.execute("CREATE TABLE member (id INTEGER PRIMARY KEY, name TEXT)", &[])?;
/// let affected = executor.execute(
///     "INSERT INTO `member` (`name`) VALUES (?)",
///     &[Value::from("John")],
/// )?;
/// assert_eq!(affected, 1);
///
/// let rows = executor.query("SELECT id, name FROM member", &[])?;
/// assert_eq!(rows[0].get_by_name("name"), Some(&Value::from("John")));
/// # Ok(())
/// # }
/// ```
pub trait Executor {
    /// Execute a SQL statement and return the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns the driver error if the statement fails.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, BoxError>;

    /// Execute a query and return all rows
    ///
    /// # Errors
    ///
    /// Returns the driver error if the query fails.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, BoxError>;

    /// Execute an INSERT and report the generated identity if known
    ///
    /// The default implementation delegates to [`execute`](Executor::execute)
    /// and reports no identity.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the statement fails.
    fn execute_insert(&self, sql: &str, params: &[Value]) -> Result<InsertOutcome, BoxError> {
        Ok(InsertOutcome {
            rows_affected: self.execute(sql, params)?,
            last_insert_id: None,
        })
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, BoxError> {
        (**self).execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, BoxError> {
        (**self).query(sql, params)
    }

    fn execute_insert(&self, sql: &str, params: &[Value]) -> Result<InsertOutcome, BoxError> {
        (**self).execute_insert(sql, params)
    }
}

fn instrument<R>(
    kind: &'static str,
    query: &Query,
    run: impl FnOnce() -> Result<R, BoxError>,
) -> Result<R> {
    #[cfg(feature = "tracing")]
    let _span = tracing_helpers::statement_span(kind, query.sql()).entered();

    let settings = config::settings();
    if settings.log_statements {
        log::debug!("{kind}: {} ({} params)", query.sql(), query.params().len());
    }

    let start = Instant::now();
    let result = run();
    let elapsed = start.elapsed();

    #[cfg(feature = "metrics")]
    METRICS.record_statement(kind, elapsed);
    if settings.slow_query_ms > 0 && elapsed.as_millis() >= u128::from(settings.slow_query_ms) {
        #[cfg(feature = "metrics")]
        METRICS.record_slow(kind);
        log::warn!("slow {kind} took {} ms: {}", elapsed.as_millis(), query.sql());
    }

    result.map_err(|source| {
        #[cfg(feature = "metrics")]
        METRICS.record_error(kind);
        log::debug!("{kind} failed: {source} (sql: {})", query.sql());
        KeelError::Execution {
            sql: query.sql().to_string(),
            source,
        }
    })
}

pub(crate) fn run_execute<X: Executor + ?Sized>(executor: &X, query: &Query) -> Result<u64> {
    instrument("execute", query, || executor.execute(query.sql(), query.params()))
}

pub(crate) fn run_query<X: Executor + ?Sized>(executor: &X, query: &Query) -> Result<Vec<Row>> {
    instrument("query", query, || executor.query(query.sql(), query.params()))
}

pub(crate) fn run_insert<X: Executor + ?Sized>(executor: &X, query: &Query) -> Result<InsertOutcome> {
    instrument("insert", query, || {
        executor.execute_insert(query.sql(), query.params())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockExecutor;
    use std::error::Error as _;

    #[test]
    fn test_default_execute_insert_has_no_id() {
        let mock = MockExecutor::new();
        let outcome = mock.execute_insert("INSERT INTO t () VALUES ()", &[]).unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.last_insert_id, None);
    }

    #[test]
    fn test_run_execute_wraps_failure() {
        let mock = MockExecutor::new();
        mock.fail_next("disk full");
        let query = Query::new("DELETE FROM `t`".to_string(), Vec::new());

        let err = run_execute(&mock, &query).unwrap_err();
        match &err {
            KeelError::Execution { sql, .. } => assert_eq!(sql, "DELETE FROM `t`"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.source().map(|s| s.to_string()), Some("disk full".to_string()));
    }

    #[test]
    fn test_run_query_through_reference() {
        let mock = MockExecutor::new();
        mock.push_rows(&["n"], vec![vec![Value::Int(Some(1))]]);
        let by_ref: &dyn Executor = &mock;
        let query = Query::new("SELECT 1 AS n".to_string(), Vec::new());
        let rows = run_query(&by_ref, &query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(mock.statements()[0].0, "SELECT 1 AS n");
    }
}
