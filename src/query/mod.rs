//! Statement builders and the compiled [`Query`] they produce.
//!
//! Every builder is fluent, mutable and single-use: chain calls on it, then
//! call `compile()` (or a terminal such as `all`, `execute`) exactly once.
//! Errors raised by chained calls are recorded and reported by the terminal
//! call.
//!
//! - [`SelectBuilder`]: SELECT with conditions, ordering, LIMIT/OFFSET
//! - [`InsertBuilder`]: INSERT, running the entity's before-insert hooks
//! - [`UpdateBuilder`]: UPDATE with explicit SET columns
//! - [`DeleteBuilder`]: DELETE
//! - [`PaginatedSelect`] / [`query_by_sql_paginated`]: limit-plus-one pages
//!
//! # Examples
//!
//! ```no_run
//! use keel::{Entity, Executor};
//! # use keel::DescriptorBuilder;
//! # #[derive(Default)]
//! # struct Member { id: i64, name: String }
//! # impl Entity for Member {
//! #     fn declare() -> DescriptorBuilder<Self> {
//! #         DescriptorBuilder::<Self>::new("member")
//! #             .primary_key("id", |m| &m.id, |m| &mut m.id)
//! #             .column("name", |m| &m.name, |m| &mut m.name)
//! #     }
//! # }
//! # fn demo(executor: &dyn Executor) -> keel::Result<()> {
//! let members = Member::select()
//!     .filter("name LIKE ?", ["J%"])
//!     .filter("id < ? OR id > ?", [10, 20])
//!     .order_by("id DESC")
//!     .limit(5)
//!     .all(executor)?;
//! # Ok(())
//! # }
//! ```

use sea_query::Value;

use crate::error::{KeelError, Result};

pub(crate) mod clause;
pub mod delete;
pub mod ident;
pub mod insert;
pub mod paginate;
pub mod select;
pub mod update;

pub use clause::IntoParams;
pub use delete::DeleteBuilder;
pub use ident::{quote_identifier, Dialect};
pub use insert::InsertBuilder;
pub use paginate::{query_by_sql_paginated, PageAddress, Paginated, PaginatedSelect};
pub use select::SelectBuilder;
pub use update::UpdateBuilder;

/// Compiled statement: SQL text with `?` placeholders and its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    sql: String,
    params: Vec<Value>,
}

impl Query {
    pub(crate) fn new(sql: String, params: Vec<Value>) -> Self {
        Self { sql, params }
    }

    /// Build a query from raw SQL, checking the placeholder count.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Build`] when the number of `?` placeholders outside
    /// quotes differs from `params.len()`.
    pub fn checked(sql: impl Into<String>, params: Vec<Value>) -> Result<Self> {
        let sql = sql.into();
        let expected = clause::count_placeholders(&sql);
        if expected != params.len() {
            return Err(KeelError::build(format!(
                "statement has {expected} placeholder(s) but {} value(s) were bound",
                params.len()
            )));
        }
        Ok(Self { sql, params })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_counts_placeholders() {
        let q = Query::checked("SELECT * FROM member WHERE id < ?", vec![Value::Int(Some(3))]).unwrap();
        assert_eq!(q.sql(), "SELECT * FROM member WHERE id < ?");
        assert_eq!(q.params().len(), 1);
        assert!(Query::checked("SELECT '?'", vec![Value::Int(Some(1))]).is_err());
        assert!(Query::checked("SELECT '?'", Vec::new()).is_ok());
    }
}
