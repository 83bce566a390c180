//! Entity descriptors: per-type table and column metadata.
//!
//! A descriptor is declared once per entity type with [`DescriptorBuilder`]
//! inside [`Entity::declare`](crate::Entity::declare), built lazily on first
//! use and cached for the life of the process. Each column binds a name to a
//! getter/setter pair over a struct field, a [`Converter`] and a [`ColumnRole`].
//!
//! # Examples
//!
//! ```
//! use keel::{DescriptorBuilder, Entity};
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
//! let descriptor = Member::descriptor().unwrap();
//! assert_eq!(descriptor.table_name(), "member");
//! assert_eq!(descriptor.columns().len(), 3);
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use once_cell::sync::{Lazy, OnceCell};
use sea_query::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::entity::Entity;
use crate::error::{BoxError, KeelError, Result};
use crate::query::InsertBuilder;
use crate::value::{extract_i64, extract_json, is_null, variant_name, ColumnKind, FieldValue};

/// What a column means to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Plain,
    PrimaryKey,
    /// Set to the current Unix time on insert unless supplied
    CreatedTimestamp,
    /// Set on insert, and refreshed by `Record::update`
    UpdatedTimestamp,
}

impl ColumnRole {
    pub fn is_timestamp(self) -> bool {
        matches!(self, ColumnRole::CreatedTimestamp | ColumnRole::UpdatedTimestamp)
    }
}

/// Conversion between a raw column value and the field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    Identity,
    /// JSON text or blob in the database, a decoded document in the field
    Json,
    /// Integer Unix seconds
    Timestamp,
}

impl Converter {
    /// Raw database value to the value handed to the field setter.
    pub fn decode(self, raw: Value) -> Result<Value, String> {
        match self {
            Converter::Identity => Ok(raw),
            Converter::Json => {
                if is_null(&raw) {
                    return Ok(Value::Json(None));
                }
                extract_json(raw)
                    .map(|doc| Value::Json(Some(Box::new(doc))))
                    .map_err(|e| e.to_string())
            }
            Converter::Timestamp => {
                if is_null(&raw) {
                    return Ok(Value::BigInt(None));
                }
                extract_i64(&raw)
                    .map(|secs| Value::BigInt(Some(secs)))
                    .map_err(|_| format!("expected Unix seconds, got {}", variant_name(&raw)))
            }
        }
    }

    /// Field value to the value bound as a statement parameter.
    pub fn encode(self, value: Value) -> Result<Value, String> {
        match self {
            Converter::Identity | Converter::Timestamp => Ok(value),
            Converter::Json => match value {
                Value::Json(Some(doc)) => serde_json::to_string(&*doc)
                    .map(|text| Value::String(Some(text)))
                    .map_err(|e| e.to_string()),
                Value::String(Some(text)) => Ok(Value::String(Some(text))),
                v if is_null(&v) => Ok(Value::String(None)),
                other => Err(format!("cannot store {} in a JSON column", variant_name(&other))),
            },
        }
    }
}

type Reader<T> = Box<dyn Fn(&T) -> Result<Value, String> + Send + Sync>;
type Writer<T> = Box<dyn Fn(&mut T, Value) -> Result<(), String> + Send + Sync>;

/// Callback run by an [`InsertBuilder`] before it compiles.
pub type BeforeInsertHook<T> =
    Box<dyn Fn(&mut InsertBuilder<T>) -> Result<(), BoxError> + Send + Sync>;

/// One mapped column.
pub struct ColumnDef<T> {
    name: String,
    kind: ColumnKind,
    role: ColumnRole,
    converter: Converter,
    nullable: bool,
    read: Reader<T>,
    write: Writer<T>,
}

impl<T> ColumnDef<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn role(&self) -> ColumnRole {
        self.role
    }

    pub fn converter(&self) -> Converter {
        self.converter
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_primary_key(&self) -> bool {
        self.role == ColumnRole::PrimaryKey
    }

    /// Current value of the field, in field form (before encoding).
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Mapping`] if the field cannot be represented (JSON
    /// serialization failure).
    pub fn get(&self, entity: &T) -> Result<Value> {
        (self.read)(entity).map_err(|message| KeelError::mapping(&self.name, message))
    }

    /// Decode a raw database value and assign it to the field.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Mapping`] for NULL in a non-nullable column or a
    /// value the converter or field type rejects.
    pub fn assign(&self, entity: &mut T, raw: Value) -> Result<()> {
        let decoded = self
            .converter
            .decode(raw)
            .map_err(|message| KeelError::mapping(&self.name, message))?;
        if !self.nullable && is_null(&decoded) {
            return Err(KeelError::mapping(&self.name, "NULL in non-nullable column"));
        }
        (self.write)(entity, decoded).map_err(|message| KeelError::mapping(&self.name, message))
    }

    /// Encode a field-form value as a bind parameter.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Build`] when the converter rejects the value.
    pub fn encode(&self, value: Value) -> Result<Value> {
        self.converter
            .encode(value)
            .map_err(|message| KeelError::build(format!("column `{}`: {message}", self.name)))
    }
}

impl<T> fmt::Debug for ColumnDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("role", &self.role)
            .field("converter", &self.converter)
            .field("nullable", &self.nullable)
            .finish_non_exhaustive()
    }
}

/// Immutable, process-wide metadata for one entity type.
pub struct EntityDescriptor<T: 'static> {
    table: String,
    columns: Vec<ColumnDef<T>>,
    index: HashMap<String, usize>,
    primary_key: Vec<usize>,
    before_insert: Vec<BeforeInsertHook<T>>,
}

impl<T: 'static> EntityDescriptor<T> {
    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDef<T>] {
        &self.columns
    }

    /// Index of the column matching `name`: exact match first, then ASCII
    /// case-insensitive.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied().or_else(|| {
            self.columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef<T>> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &ColumnDef<T>> {
        self.primary_key.iter().map(|&idx| &self.columns[idx])
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    pub fn before_insert_hooks(&self) -> &[BeforeInsertHook<T>] {
        &self.before_insert
    }

    pub(crate) fn require_primary_key(&self, operation: &str) -> Result<&[usize]> {
        if self.primary_key.is_empty() {
            return Err(KeelError::descriptor::<T>(format!(
                "`{operation}` needs a primary key but table `{}` declares none",
                self.table
            )));
        }
        Ok(&self.primary_key)
    }
}

impl<T: 'static> fmt::Debug for EntityDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("primary_key", &self.primary_key)
            .field("before_insert", &self.before_insert.len())
            .finish()
    }
}

/// Fluent declaration of an [`EntityDescriptor`].
pub struct DescriptorBuilder<T: 'static> {
    table: String,
    columns: Vec<ColumnDef<T>>,
    before_insert: Vec<BeforeInsertHook<T>>,
}

impl<T: 'static> DescriptorBuilder<T> {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            before_insert: Vec::new(),
        }
    }

    /// Map a plain column to a field.
    pub fn column<F: FieldValue + 'static>(
        self,
        name: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.field(name, ColumnRole::Plain, Converter::Identity, F::KIND, get, get_mut)
    }

    /// Map a primary-key column. Call once per column of a composite key.
    pub fn primary_key<F: FieldValue + 'static>(
        self,
        name: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.field(name, ColumnRole::PrimaryKey, Converter::Identity, F::KIND, get, get_mut)
    }

    /// Map an integer Unix-seconds column filled on insert.
    pub fn created_timestamp<F: FieldValue + 'static>(
        self,
        name: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.field(
            name,
            ColumnRole::CreatedTimestamp,
            Converter::Timestamp,
            ColumnKind::Timestamp,
            get,
            get_mut,
        )
    }

    /// Map an integer Unix-seconds column filled on insert and refreshed on update.
    pub fn updated_timestamp<F: FieldValue + 'static>(
        self,
        name: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.field(
            name,
            ColumnRole::UpdatedTimestamp,
            Converter::Timestamp,
            ColumnKind::Timestamp,
            get,
            get_mut,
        )
    }

    /// Map a JSON column to any serde type.
    ///
    /// The column is nullable when `F` deserializes from JSON `null`
    /// (e.g. `Option<_>`).
    pub fn json_column<F>(self, name: &str, get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self
    where
        F: Serialize + DeserializeOwned + 'static,
    {
        let nullable = serde_json::from_value::<F>(serde_json::Value::Null).is_ok();
        let read: Reader<T> = Box::new(move |entity: &T| {
            serde_json::to_value(get(entity))
                .map(|doc| Value::Json(Some(Box::new(doc))))
                .map_err(|e| format!("JSON encode failed: {e}"))
        });
        let write: Writer<T> = Box::new(move |entity: &mut T, value: Value| {
            let doc = match value {
                Value::Json(Some(doc)) => *doc,
                v if is_null(&v) => serde_json::Value::Null,
                other => return Err(format!("expected a JSON document, got {}", variant_name(&other))),
            };
            *get_mut(entity) = serde_json::from_value(doc).map_err(|e| format!("JSON decode failed: {e}"))?;
            Ok(())
        });
        self.push(ColumnDef {
            name: name.to_string(),
            kind: ColumnKind::Json,
            role: ColumnRole::Plain,
            converter: Converter::Json,
            nullable,
            read,
            write,
        })
    }

    /// Register a hook run by every insert of this entity, in registration order.
    pub fn before_insert<H>(mut self, hook: H) -> Self
    where
        H: Fn(&mut InsertBuilder<T>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.before_insert.push(Box::new(hook));
        self
    }

    fn field<F: FieldValue + 'static>(
        self,
        name: &str,
        role: ColumnRole,
        converter: Converter,
        kind: ColumnKind,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        let read: Reader<T> = Box::new(move |entity: &T| Ok(get(entity).to_value()));
        let write: Writer<T> = Box::new(move |entity: &mut T, value: Value| {
            *get_mut(entity) = F::from_value(value).map_err(|e| e.to_string())?;
            Ok(())
        });
        self.push(ColumnDef {
            name: name.to_string(),
            kind,
            role,
            converter,
            nullable: F::NULLABLE,
            read,
            write,
        })
    }

    fn push(mut self, column: ColumnDef<T>) -> Self {
        self.columns.push(column);
        self
    }

    /// Validate and freeze the declaration.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Descriptor`] for an empty table name or a column
    /// declared twice.
    pub fn build(self) -> Result<EntityDescriptor<T>> {
        if self.table.trim().is_empty() {
            return Err(KeelError::descriptor::<T>("table name is empty"));
        }
        let mut index = HashMap::with_capacity(self.columns.len());
        for (idx, column) in self.columns.iter().enumerate() {
            if index.insert(column.name.clone(), idx).is_some() {
                return Err(KeelError::descriptor::<T>(format!(
                    "column `{}` declared twice on table `{}`",
                    column.name, self.table
                )));
            }
        }
        let primary_key = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_primary_key())
            .map(|(idx, _)| idx)
            .collect();
        Ok(EntityDescriptor {
            table: self.table,
            columns: self.columns,
            index,
            primary_key,
            before_insert: self.before_insert,
        })
    }
}

type Slot = OnceCell<Box<dyn Any + Send + Sync>>;

static REGISTRY: Lazy<RwLock<HashMap<TypeId, &'static Slot>>> = Lazy::new(Default::default);

fn slot_for(id: TypeId) -> &'static Slot {
    let existing = REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .copied();
    if let Some(slot) = existing {
        return slot;
    }
    let mut slots = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    *slots
        .entry(id)
        .or_insert_with(|| -> &'static Slot { Box::leak(Box::new(OnceCell::new())) })
}

/// The cached descriptor of `T`, building it on first use.
///
/// Construction runs inside `T`'s own cell, so it never blocks lookups of
/// other entity types. A failed build is not cached.
///
/// # Errors
///
/// Returns the [`KeelError::Descriptor`] produced by `T::declare().build()`.
pub fn descriptor_of<T: Entity>() -> Result<&'static EntityDescriptor<T>> {
    let slot = slot_for(TypeId::of::<T>());
    let stored = slot.get_or_try_init(|| {
        let descriptor = T::declare().build()?;
        log::debug!(
            "built descriptor for {} (table `{}`, {} columns)",
            type_name::<T>(),
            descriptor.table_name(),
            descriptor.columns().len()
        );
        Ok::<_, KeelError>(Box::new(descriptor) as Box<dyn Any + Send + Sync>)
    })?;
    stored
        .as_ref()
        .downcast_ref::<EntityDescriptor<T>>()
        .ok_or_else(|| KeelError::descriptor::<T>("registry entry has an unexpected type"))
}
