//! # Keel
//!
//! Synchronous entity mapping for MySQL-flavoured SQL: fluent statement
//! builders, a metadata-driven row mapper, limit-plus-one pagination and
//! before-insert hooks.
//!
//! Keel never opens connections or manages transactions. It produces SQL with
//! `?` placeholders and hands it to an [`Executor`] supplied by the caller.
//! [`SqliteExecutor`] (feature `sqlite`, on by default) is bundled.
//!
//! ```
//! use keel::{DescriptorBuilder, Entity, SqliteExecutor, Executor};
//!
//! #[derive(Debug, Default)]
//! struct Member {
//!     id: i64,
//!     name: String,
//!     created_on: i64,
//! }
//!
//! impl Entity for Member {
//!     fn declare() -> DescriptorBuilder<Self> {
//!         DescriptorBuilder::<Self>::new("member")
//!             .primary_key("id", |m| &m.id, |m| &mut m.id)
//!             .column("name", |m| &m.name, |m| &mut m.name)
//!             .created_timestamp("createdOn", |m| &m.created_on, |m| &mut m.created_on)
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let db = SqliteExecutor::open_in_memory()?;
//! db.execute(
//!     "CREATE TABLE member (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, createdOn INTEGER)",
//!     &[],
//! )?;
//!
//! let mut john = Member::insert().value("name", "John").execute_select(&db)?;
//! assert!(john.created_on > 0);
//!
//! john.name = "Nick".to_string();
//! assert_eq!(john.update(&db)?, 1);
//!
//! let page = Member::select_paginated(10).order_by("id").execute(&db)?;
//! assert_eq!(page.len(), 1);
//! assert!(!page.has_next_page());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod executor;
pub mod mapper;
pub mod metrics;
pub mod query;
pub mod raw_sql;
pub mod record;
pub mod row;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod value;

#[cfg(test)]
mod test_helpers;

pub use config::KeelConfig;
pub use descriptor::{
    descriptor_of, BeforeInsertHook, ColumnDef, ColumnRole, Converter, DescriptorBuilder,
    EntityDescriptor,
};
pub use entity::Entity;
pub use error::{BoxError, KeelError, Result};
pub use executor::{Executor, InsertOutcome};
pub use mapper::{map_row, map_rows};
#[cfg(feature = "metrics")]
pub use metrics::{KeelMetrics, METRICS};
pub use query::{
    quote_identifier, query_by_sql_paginated, DeleteBuilder, Dialect, InsertBuilder, IntoParams,
    PageAddress, Paginated, PaginatedSelect, Query, SelectBuilder, UpdateBuilder,
};
pub use raw_sql::{execute_by_sql, query_by_sql, single_by_sql};
pub use record::Record;
pub use row::Row;
pub use value::{ColumnKind, FieldValue, ValueExtractionError};

pub use sea_query::Value;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;
