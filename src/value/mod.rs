//! Value handling for entity fields and raw row values.
//!
//! Keel uses [`sea_query::Value`] for both bind parameters and the raw values
//! executors hand back. This module provides:
//!
//! - [`FieldValue`] for converting entity fields to and from `Value`
//! - lenient extraction helpers that tolerate driver-specific integer widths
//! - [`ColumnKind`], the semantic column type recorded in descriptors

pub mod try_getable;
pub mod types;

pub use try_getable::{
    extract_bool, extract_bytes, extract_f64, extract_i64, extract_json, extract_string,
    extract_u64, is_null, untyped_null, variant_name, ValueExtractionError,
};
pub(crate) use try_getable::is_unassigned;
pub use types::{ColumnKind, FieldValue};
