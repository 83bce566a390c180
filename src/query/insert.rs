//! INSERT builder and the before-insert hook pipeline.
//!
//! `compile` moves the builder from *open* through *running hooks* to
//! *compiled*. Hooks run once, in registration order, with the mutable
//! builder; they may set or override values but may not compile it.
//! Timestamp columns not set by the caller or a hook are filled with the
//! current Unix time.

use chrono::Utc;
use sea_query::Value;
use serde::Serialize;

use crate::entity::Entity;
use crate::error::{KeelError, Result};
use crate::executor::{run_execute, run_insert, Executor};
use crate::record::Record;
use crate::value::is_unassigned;

use super::clause::{BuilderCore, Stage};
use super::ident::Dialect;
use super::select::SelectBuilder;
use super::Query;

/// Query builder for inserting one row
///
/// # Example
///
/// ```no_run
/// # use keel::{DescriptorBuilder, Entity, Executor};
/// # #[derive(Default)]
/// # struct Member { id: i64, name: String, created_on: i64 }
/// # impl Entity for Member {
/// #     fn declare() -> DescriptorBuilder<Self> {
/// #         DescriptorBuilder::<Self>::new("member")
/// #             .primary_key("id", |m| &m.id, |m| &mut m.id)
/// #             .column("name", |m| &m.name, |m| &mut m.name)
/// #             .created_timestamp("createdOn", |m| &m.created_on, |m| &mut m.created_on)
/// #     }
/// # }
/// # fn demo(executor: &dyn Executor) -> keel::Result<()> {
/// let member = Member::insert()
///     .value("name", "John")
///     .execute_select(executor)?;
/// assert!(member.id > 0);
/// assert!(member.created_on > 0);
/// # Ok(())
/// # }
/// ```
pub struct InsertBuilder<T: 'static> {
    core: BuilderCore<T>,
    values: Vec<(String, Value)>,
}

impl<T: Entity> InsertBuilder<T> {
    pub fn new() -> Self {
        Self {
            core: BuilderCore::new(),
            values: Vec::new(),
        }
    }

    /// Execute and return the affected row count.
    ///
    /// # Errors
    ///
    /// Returns any build, hook or execution error. Nothing is executed when
    /// compilation fails.
    pub fn execute<X: Executor + ?Sized>(&mut self, executor: &X) -> Result<u64> {
        let query = self.compile()?;
        run_execute(executor, &query)
    }

    /// Execute, then read the inserted row back by its identity.
    ///
    /// The identity is the explicit primary-key value when one was set, or the
    /// id generated by the database for a single-column key.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Descriptor`] without a primary key, and an
    /// execution error when the identity cannot be resolved or the row is gone.
    pub fn execute_select<X: Executor + ?Sized>(&mut self, executor: &X) -> Result<Record<T>> {
        let query = self.compile()?;
        let descriptor = T::descriptor()?;
        let primary_key = descriptor.require_primary_key("execute_select")?;

        let outcome = run_insert(executor, &query)?;

        let explicit: Option<Vec<(String, Value)>> = primary_key
            .iter()
            .map(|&idx| {
                let column = &descriptor.columns()[idx];
                self.get_value(column.name())
                    .filter(|value| !is_unassigned(value))
                    .map(|value| (column.name().to_string(), value.clone()))
            })
            .collect();
        let identity = match (explicit, outcome.last_insert_id, primary_key) {
            (Some(identity), _, _) => identity,
            (None, Some(id), [idx]) => {
                vec![(descriptor.columns()[*idx].name().to_string(), Value::BigUnsigned(Some(id)))]
            }
            _ => {
                return Err(KeelError::Execution {
                    sql: query.sql().to_string(),
                    source: format!(
                        "cannot resolve the identity of the row inserted into `{}`",
                        descriptor.table_name()
                    )
                    .into(),
                })
            }
        };

        let mut select = SelectBuilder::<T>::new();
        select.with_dialect(self.core.dialect()).identity(&identity);
        select.first(executor)?.ok_or_else(|| KeelError::Execution {
            sql: query.sql().to_string(),
            source: format!(
                "inserted row in `{}` could not be read back",
                descriptor.table_name()
            )
            .into(),
        })
    }
}

impl<T: 'static> InsertBuilder<T> {
    /// Override the configured dialect for this statement.
    pub fn with_dialect(&mut self, dialect: Dialect) -> &mut Self {
        self.core.set_dialect(dialect);
        self
    }

    /// Set a column value; setting the same column again overwrites it.
    ///
    /// `value` takes anything convertible into a [`Value`]. For a JSON column
    /// holding a map or struct, use [`json_value`](Self::json_value), which
    /// serializes it for you.
    pub fn value<V: Into<Value>>(&mut self, column: &str, value: V) -> &mut Self {
        if self.core.mutable("value") {
            self.put(column, value.into());
        }
        self
    }

    /// Set a JSON column from any serializable value.
    pub fn json_value<S: Serialize + ?Sized>(&mut self, column: &str, value: &S) -> &mut Self {
        match serde_json::to_value(value) {
            Ok(doc) => self.value(column, Value::Json(Some(Box::new(doc)))),
            Err(err) => {
                self.core
                    .defer(KeelError::build(format!("column `{column}`: JSON encode failed: {err}")));
                self
            }
        }
    }

    /// Copy every descriptor column from `entity`.
    ///
    /// A primary-key value that is NULL or integer 0 is skipped so the
    /// database assigns the identity. Timestamp columns left at NULL or 0 are
    /// skipped too and get the current time at compile.
    pub fn values_from(&mut self, entity: &T) -> &mut Self {
        if !self.core.mutable("values_from") {
            return self;
        }
        let Some(descriptor) = self.core.descriptor() else {
            return self;
        };
        for column in descriptor.columns() {
            match column.get(entity) {
                Ok(value) => {
                    let generated = column.is_primary_key() || column.role().is_timestamp();
                    if generated && is_unassigned(&value) {
                        continue;
                    }
                    self.put(column.name(), value);
                }
                Err(err) => {
                    self.core.defer(err);
                    break;
                }
            }
        }
        self
    }

    /// Value currently set for `column`, if any.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|idx| &self.values[idx].1)
    }

    pub fn has_value(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.values
            .iter()
            .position(|(name, _)| name == column)
            .or_else(|| {
                self.values
                    .iter()
                    .position(|(name, _)| name.eq_ignore_ascii_case(column))
            })
    }

    fn put(&mut self, column: &str, value: Value) {
        match self.position(column) {
            Some(idx) => self.values[idx].1 = value,
            None => self.values.push((column.to_string(), value)),
        }
    }

    /// Run the before-insert hooks and compile to a [`Query`].
    ///
    /// # Errors
    ///
    /// - [`KeelError::Hook`] if a hook fails; the builder is spent
    /// - [`KeelError::Build`] on reuse, a call from inside a hook, an unknown
    ///   column, or an error recorded by a chained call
    pub fn compile(&mut self) -> Result<Query> {
        let descriptor = self.core.begin(Stage::RunningHooks)?;
        for hook in descriptor.before_insert_hooks() {
            if let Err(source) = hook(self) {
                self.core.finish();
                log::debug!("before-insert hook for `{}` failed: {source}", descriptor.table_name());
                return Err(KeelError::Hook {
                    table: descriptor.table_name().to_string(),
                    source,
                });
            }
        }
        self.core.finish();
        self.core.take_deferred()?;

        let now = Utc::now().timestamp();
        for column in descriptor.columns() {
            if column.role().is_timestamp() && !self.has_value(column.name()) {
                self.values
                    .push((column.name().to_string(), Value::BigInt(Some(now))));
            }
        }

        let dialect = self.core.dialect();
        let mut names = Vec::with_capacity(self.values.len());
        let mut params = Vec::with_capacity(self.values.len());
        for (name, value) in &self.values {
            let column = descriptor.column(name).ok_or_else(|| {
                KeelError::build(format!(
                    "unknown column `{name}` for table `{}`",
                    descriptor.table_name()
                ))
            })?;
            names.push(dialect.quote(column.name()));
            params.push(column.encode(value.clone())?);
        }

        let table = dialect.quote(descriptor.table_name());
        let sql = if names.is_empty() {
            match dialect {
                Dialect::MySql => format!("INSERT INTO {table} () VALUES ()"),
                Dialect::Ansi => format!("INSERT INTO {table} DEFAULT VALUES"),
            }
        } else {
            format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                names.join(", "),
                vec!["?"; names.len()].join(", ")
            )
        };
        Ok(Query::new(sql, params))
    }
}

impl<T: Entity> Default for InsertBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
