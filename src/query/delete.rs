//! DELETE builder.

use sea_query::Value;

use crate::entity::Entity;
use crate::error::Result;
use crate::executor::{run_execute, Executor};

use super::clause::{BuilderCore, Filtering, IntoParams, Stage};
use super::ident::Dialect;
use super::Query;

/// Query builder for deleting rows. Without a condition it deletes every row.
pub struct DeleteBuilder<T: 'static> {
    core: BuilderCore<T>,
    filtering: Filtering,
}

impl<T: Entity> DeleteBuilder<T> {
    pub fn new() -> Self {
        Self {
            core: BuilderCore::new(),
            filtering: Filtering::default(),
        }
    }

    pub fn with_dialect(&mut self, dialect: Dialect) -> &mut Self {
        self.core.set_dialect(dialect);
        self
    }

    pub fn filter<P: IntoParams>(&mut self, template: &str, params: P) -> &mut Self {
        if self.core.mutable("filter") {
            if let Err(err) = self.filtering.condition(template, params.into_params()) {
                self.core.defer(err);
            }
        }
        self
    }

    pub fn order_by(&mut self, fragment: &str) -> &mut Self {
        if self.core.mutable("order_by") {
            self.filtering.order_by(fragment);
        }
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        if self.core.mutable("limit") {
            self.filtering.limit = Some(limit);
        }
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        if self.core.mutable("offset") {
            self.filtering.offset = Some(offset);
        }
        self
    }

    pub(crate) fn identity(&mut self, identity: &[(String, Value)]) -> &mut Self {
        if self.core.mutable("identity") {
            self.filtering.identity(self.core.dialect(), identity);
        }
        self
    }

    /// # Errors
    ///
    /// Returns [`KeelError::Build`](crate::KeelError::Build) on reuse or a
    /// recorded chain error.
    pub fn compile(&mut self) -> Result<Query> {
        let descriptor = self.core.begin(Stage::Compiled)?;
        let mut sql = format!("DELETE FROM {}", self.core.dialect().quote(descriptor.table_name()));
        let mut params = Vec::new();
        self.filtering.render(&mut sql, &mut params);
        Ok(Query::new(sql, params))
    }

    /// Execute and return the affected row count.
    ///
    /// # Errors
    ///
    /// Returns any build or execution error.
    pub fn execute<X: Executor + ?Sized>(&mut self, executor: &X) -> Result<u64> {
        let query = self.compile()?;
        run_execute(executor, &query)
    }
}

impl<T: Entity> Default for DeleteBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeelError;
    use crate::test_helpers::{Member, MockExecutor};

    #[test]
    fn test_delete_all() {
        assert_eq!(Member::delete().compile().unwrap().sql(), "DELETE FROM `member`");
    }

    #[test]
    fn test_delete_with_conditions() {
        let q = Member::delete()
            .filter("createdOn < ?", [100_i64])
            .filter("name = ? OR name = ?", ["a", "b"])
            .order_by("id")
            .limit(10)
            .compile()
            .unwrap();
        assert_eq!(
            q.sql(),
            "DELETE FROM `member` WHERE (createdOn < ?) AND (name = ? OR name = ?) ORDER BY id LIMIT 10"
        );
        assert_eq!(q.params().len(), 3);
    }

    #[test]
    fn test_delete_execution_error_keeps_sql() {
        let mock = MockExecutor::new();
        mock.fail_next("locked");
        let err = Member::delete().filter("id = ?", [1]).execute(&mock).unwrap_err();
        match err {
            KeelError::Execution { sql, .. } => assert_eq!(sql, "DELETE FROM `member` WHERE (id = ?)"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
