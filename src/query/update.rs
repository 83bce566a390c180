//! UPDATE builder.

use sea_query::Value;
use serde::Serialize;

use crate::entity::Entity;
use crate::error::{KeelError, Result};
use crate::executor::{run_execute, Executor};

use super::clause::{BuilderCore, Filtering, IntoParams, Stage};
use super::ident::Dialect;
use super::Query;

/// Query builder for updating rows
///
/// Column names passed to [`set`](Self::set) must belong to the entity;
/// condition templates are raw SQL.
///
/// # Example
///
/// ```no_run
/// # use keel::{DescriptorBuilder, Entity, Executor};
/// # #[derive(Default)]
/// # struct Member { id: i64, name: String }
/// # impl Entity for Member {
/// #     fn declare() -> DescriptorBuilder<Self> {
/// #         DescriptorBuilder::<Self>::new("member")
/// #             .primary_key("id", |m| &m.id, |m| &mut m.id)
/// #             .column("name", |m| &m.name, |m| &mut m.name)
/// #     }
/// # }
/// # fn demo(executor: &dyn Executor) -> keel::Result<()> {
/// let renamed = Member::update()
///     .set("name", "Nick")
///     .filter("name = ?", ["John"])
///     .execute(executor)?;
/// # Ok(())
/// # }
/// ```
pub struct UpdateBuilder<T: 'static> {
    core: BuilderCore<T>,
    sets: Vec<(String, Value)>,
    filtering: Filtering,
}

impl<T: Entity> UpdateBuilder<T> {
    pub fn new() -> Self {
        Self {
            core: BuilderCore::new(),
            sets: Vec::new(),
            filtering: Filtering::default(),
        }
    }

    pub fn with_dialect(&mut self, dialect: Dialect) -> &mut Self {
        self.core.set_dialect(dialect);
        self
    }

    /// Assign `column = value`; a second call for the same column overwrites.
    pub fn set<V: Into<Value>>(&mut self, column: &str, value: V) -> &mut Self {
        if self.core.mutable("set") {
            let value = value.into();
            match self.sets.iter_mut().find(|(name, _)| name == column) {
                Some(slot) => slot.1 = value,
                None => self.sets.push((column.to_string(), value)),
            }
        }
        self
    }

    /// Assign a JSON column from any serializable value.
    pub fn set_json<S: Serialize + ?Sized>(&mut self, column: &str, value: &S) -> &mut Self {
        match serde_json::to_value(value) {
            Ok(doc) => self.set(column, Value::Json(Some(Box::new(doc)))),
            Err(err) => {
                self.core
                    .defer(KeelError::build(format!("column `{column}`: JSON encode failed: {err}")));
                self
            }
        }
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

    /// Compile to a [`Query`]. SET parameters precede WHERE parameters.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Build`] when nothing is set, a column is unknown,
    /// or the builder was already compiled.
    pub fn compile(&mut self) -> Result<Query> {
        let descriptor = self.core.begin(Stage::Compiled)?;
        if self.sets.is_empty() {
            return Err(KeelError::build(format!(
                "UPDATE of `{}` has no columns to set",
                descriptor.table_name()
            )));
        }
        let dialect = self.core.dialect();
        let mut assignments = Vec::with_capacity(self.sets.len());
        let mut params = Vec::with_capacity(self.sets.len());
        for (name, value) in &self.sets {
            let column = descriptor.column(name).ok_or_else(|| {
                KeelError::build(format!(
                    "unknown column `{name}` for table `{}`",
                    descriptor.table_name()
                ))
            })?;
            assignments.push(format!("{} = ?", dialect.quote(column.name())));
            params.push(column.encode(value.clone())?);
        }
        let mut sql = format!(
            "UPDATE {} SET {}",
            dialect.quote(descriptor.table_name()),
            assignments.join(", ")
        );
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

impl<T: Entity> Default for UpdateBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
