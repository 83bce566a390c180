//! Raw SQL helpers.
//!
//! Caller-written SQL with `?` placeholders, mapped through an entity's
//! descriptor. Result columns that match no field are kept as extras, so
//! computed aliases stay reachable through [`Record::extra`].

use crate::entity::Entity;
use crate::error::Result;
use crate::executor::{run_execute, run_query, Executor};
use crate::mapper::map_rows;
use crate::query::{IntoParams, Query};
use crate::record::Record;

/// Run a query and map every row to `T`
///
/// # Arguments
///
/// * `executor` - The executor to use for database operations
/// * `sql` - SQL query string with `?` placeholders
/// * `params` - Values bound to the placeholders, in order
///
/// # Errors
///
/// Returns [`KeelError::Build`](crate::KeelError::Build) on a placeholder
/// count mismatch, and any execution or mapping error.
///
/// # Examples
///
/// ```no_run
/// # use keel::{DescriptorBuilder, Entity, Executor, Value};
/// # #[derive(Default)]
/// # struct Member { id: i64 }
/// # impl Entity for Member {
/// #     fn declare() -> DescriptorBuilder<Self> {
/// #         DescriptorBuilder::<Self>::new("member").primary_key("id", |m| &m.id, |m| &mut m.id)
/// #     }
/// # }
/// # fn demo(executor: &dyn Executor) -> keel::Result<()> {
/// let members = keel::query_by_sql::<Member, _, _>(
///     executor,
///     "SELECT id, id + 1 AS idPlusOne FROM member WHERE id < ? ORDER BY id",
///     [10],
/// )?;
/// for member in &members {
///     assert_eq!(member.extra("idPlusOne"), Some(&Value::BigInt(Some(member.id + 1))));
/// }
/// # Ok(())
/// # }
/// ```
pub fn query_by_sql<T, X, P>(executor: &X, sql: &str, params: P) -> Result<Vec<Record<T>>>
where
    T: Entity,
    X: Executor + ?Sized,
    P: IntoParams,
{
    let query = Query::checked(sql, params.into_params())?;
    let descriptor = T::descriptor()?;
    let rows = run_query(executor, &query)?;
    map_rows(descriptor, rows)
}

/// Run a query and map its first row, if any
///
/// The SQL is run as written; add a `LIMIT 1` yourself when the query can
/// return many rows.
///
/// # Errors
///
/// Same as [`query_by_sql`].
pub fn single_by_sql<T, X, P>(executor: &X, sql: &str, params: P) -> Result<Option<Record<T>>>
where
    T: Entity,
    X: Executor + ?Sized,
    P: IntoParams,
{
    Ok(query_by_sql(executor, sql, params)?.into_iter().next())
}

/// Execute a statement and return the number of rows affected
///
/// # Errors
///
/// Returns [`KeelError::Build`](crate::KeelError::Build) on a placeholder
/// count mismatch, and any execution error.
pub fn execute_by_sql<X, P>(executor: &X, sql: &str, params: P) -> Result<u64>
where
    X: Executor + ?Sized,
    P: IntoParams,
{
    let query = Query::checked(sql, params.into_params())?;
    run_execute(executor, &query)
}
