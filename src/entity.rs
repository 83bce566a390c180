//! The `Entity` trait: entry point for every typed operation.

use crate::descriptor::{descriptor_of, DescriptorBuilder, EntityDescriptor};
use crate::error::Result;
use crate::query::{DeleteBuilder, InsertBuilder, PaginatedSelect, SelectBuilder, UpdateBuilder};

/// A plain struct mapped to one table.
///
/// Implementors only declare their columns; every other method is provided.
/// `Default` supplies the blank instance the row mapper fills in.
pub trait Entity: Default + 'static {
    /// Declare the table and columns. Called once per process, on first use.
    fn declare() -> DescriptorBuilder<Self>;

    /// The cached descriptor for this type
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Descriptor`](crate::KeelError::Descriptor) when the
    /// declaration is invalid.
    fn descriptor() -> Result<&'static EntityDescriptor<Self>> {
        descriptor_of::<Self>()
    }

    fn select() -> SelectBuilder<Self> {
        SelectBuilder::new()
    }

    fn insert() -> InsertBuilder<Self> {
        InsertBuilder::new()
    }

    fn update() -> UpdateBuilder<Self> {
        UpdateBuilder::new()
    }

    fn delete() -> DeleteBuilder<Self> {
        DeleteBuilder::new()
    }

    /// A select that fetches `entries_per_page` rows per call using limit-plus-one.
    fn select_paginated(entries_per_page: u64) -> PaginatedSelect<Self> {
        PaginatedSelect::new(entries_per_page)
    }
}
