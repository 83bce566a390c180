//! SELECT builder.

use crate::entity::Entity;
use crate::error::Result;
use crate::executor::{run_query, Executor};
use crate::mapper::map_rows;
use crate::record::Record;

use super::clause::{BuilderCore, Filtering, IntoParams, Stage};
use super::ident::Dialect;
use super::paginate::PaginatedSelect;
use super::Query;
use sea_query::Value;

/// Query builder for selecting records
///
/// Returned by [`Entity::select`]. Conditions are SQL templates with `?`
/// placeholders; they are parenthesized and joined with `AND`.
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
/// let john = Member::select()
///     .filter("name = ?", ["John"])
///     .first(executor)?;
///
/// let with_extra = Member::select()
///     .columns(["id", "name", "id + 1 AS idPlusOne"])
///     .order_by("id")
///     .all(executor)?;
/// # Ok(())
/// # }
/// ```
pub struct SelectBuilder<T: 'static> {
    core: BuilderCore<T>,
    columns: Vec<String>,
    filtering: Filtering,
    for_update: bool,
}

impl<T: Entity> SelectBuilder<T> {
    pub fn new() -> Self {
        Self {
            core: BuilderCore::new(),
            columns: Vec::new(),
            filtering: Filtering::default(),
            for_update: false,
        }
    }

    /// Override the configured dialect for this statement.
    pub fn with_dialect(&mut self, dialect: Dialect) -> &mut Self {
        self.core.set_dialect(dialect);
        self
    }

    /// Explicit select list; defaults to `*`. Entries are SQL expressions and
    /// are not quoted, so computed columns such as `id + 1 AS idPlusOne` work.
    pub fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.core.mutable("columns") {
            self.columns.extend(columns.into_iter().map(Into::into));
        }
        self
    }

    /// Add a WHERE fragment.
    pub fn filter<P: IntoParams>(&mut self, template: &str, params: P) -> &mut Self {
        if self.core.mutable("filter") {
            if let Err(err) = self.filtering.condition(template, params.into_params()) {
                self.core.defer(err);
            }
        }
        self
    }

    /// Add an ORDER BY fragment such as `id DESC`.
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

    /// Append `FOR UPDATE`.
    pub fn for_update(&mut self) -> &mut Self {
        if self.core.mutable("for_update") {
            self.for_update = true;
        }
        self
    }

    pub(crate) fn identity(&mut self, identity: &[(String, Value)]) -> &mut Self {
        if self.core.mutable("identity") {
            self.filtering.identity(self.core.dialect(), identity);
        }
        self
    }

    /// Compile to a [`Query`].
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Build`](crate::KeelError::Build) on reuse or on an
    /// error recorded by a chained call, and the descriptor error if the
    /// entity declaration is invalid.
    pub fn compile(&mut self) -> Result<Query> {
        let descriptor = self.core.begin(Stage::Compiled)?;
        let mut sql = String::from("SELECT ");
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.core.dialect().quote(descriptor.table_name()));
        let mut params = Vec::new();
        self.filtering.render(&mut sql, &mut params);
        if self.for_update {
            sql.push_str(" FOR UPDATE");
        }
        Ok(Query::new(sql, params))
    }

    /// Compile, execute and map every row.
    ///
    /// # Errors
    ///
    /// Returns any build, execution or mapping error.
    pub fn all<X: Executor + ?Sized>(&mut self, executor: &X) -> Result<Vec<Record<T>>> {
        let query = self.compile()?;
        let rows = run_query(executor, &query)?;
        map_rows(T::descriptor()?, rows)
    }

    /// Apply `LIMIT 1` and return the first record, if any.
    ///
    /// # Errors
    ///
    /// Returns any build, execution or mapping error.
    pub fn first<X: Executor + ?Sized>(&mut self, executor: &X) -> Result<Option<Record<T>>> {
        self.limit(1);
        Ok(self.all(executor)?.into_iter().next())
    }

    /// Turn this select into a limit-plus-one paginated select.
    pub fn paginate(self, entries_per_page: u64) -> PaginatedSelect<T> {
        PaginatedSelect::from_select(self, entries_per_page)
    }
}

impl<T: Entity> Default for SelectBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
