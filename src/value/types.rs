//! Entity field types and their conversion to and from `sea_query::Value`.
//!
//! Every field bound through [`DescriptorBuilder::column`](crate::DescriptorBuilder::column)
//! implements [`FieldValue`]. `Option<T>` marks a nullable column; a plain `T`
//! rejects NULL at mapping time.

use sea_query::Value;

use super::try_getable::{
    extract_bool, extract_bytes, extract_f64, extract_i64, extract_json, extract_string,
    extract_u64, is_null, ValueExtractionError,
};

/// Semantic column type recorded in the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Boolean,
    Integer,
    Float,
    Text,
    Bytes,
    Json,
    /// Integer seconds since the Unix epoch
    Timestamp,
}

/// Conversion between a Rust field type and a `Value`.
///
/// `from_value` is lenient about integer widths; see
/// [`extract_i64`](super::try_getable::extract_i64).
pub trait FieldValue: Sized {
    /// Semantic type of the column holding this field
    const KIND: ColumnKind;
    /// Whether NULL is a legal value
    const NULLABLE: bool = false;

    /// Convert the field to a bindable value
    fn to_value(&self) -> Value;

    /// Convert a decoded raw value into the field type
    ///
    /// # Errors
    ///
    /// Returns [`ValueExtractionError`] when the value is NULL or has an
    /// incompatible type.
    fn from_value(value: Value) -> Result<Self, ValueExtractionError>;

    /// Typed NULL for this field
    fn null_value() -> Value;
}

impl FieldValue for bool {
    const KIND: ColumnKind = ColumnKind::Boolean;

    fn to_value(&self) -> Value {
        Value::Bool(Some(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueExtractionError> {
        extract_bool(&value)
    }

    fn null_value() -> Value {
        Value::Bool(None)
    }
}

impl FieldValue for i32 {
    const KIND: ColumnKind = ColumnKind::Integer;

    fn to_value(&self) -> Value {
        Value::Int(Some(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueExtractionError> {
        let wide = extract_i64(&value)?;
        i32::try_from(wide)
            .map_err(|_| ValueExtractionError::ConversionError(format!("{wide} does not fit in i32")))
    }

    fn null_value() -> Value {
        Value::Int(None)
    }
}

impl FieldValue for i64 {
    const KIND: ColumnKind = ColumnKind::Integer;

    fn to_value(&self) -> Value {
        Value::BigInt(Some(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueExtractionError> {
        extract_i64(&value)
    }

    fn null_value() -> Value {
        Value::BigInt(None)
    }
}

impl FieldValue for u32 {
    const KIND: ColumnKind = ColumnKind::Integer;

    fn to_value(&self) -> Value {
        Value::Unsigned(Some(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueExtractionError> {
        let wide = extract_u64(&value)?;
        u32::try_from(wide)
            .map_err(|_| ValueExtractionError::ConversionError(format!("{wide} does not fit in u32")))
    }

    fn null_value() -> Value {
        Value::Unsigned(None)
    }
}

impl FieldValue for u64 {
    const KIND: ColumnKind = ColumnKind::Integer;

    fn to_value(&self) -> Value {
        Value::BigUnsigned(Some(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueExtractionError> {
        extract_u64(&value)
    }

    fn null_value() -> Value {
        Value::BigUnsigned(None)
    }
}

impl FieldValue for f64 {
    const KIND: ColumnKind = ColumnKind::Float;

    fn to_value(&self) -> Value {
        Value::Double(Some(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueExtractionError> {
        extract_f64(&value)
    }

    fn null_value() -> Value {
        Value::Double(None)
    }
}

impl FieldValue for String {
    const KIND: ColumnKind = ColumnKind::Text;

    fn to_value(&self) -> Value {
        Value::String(Some(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ValueExtractionError> {
        extract_string(value)
    }

    fn null_value() -> Value {
        Value::String(None)
    }
}

impl FieldValue for Vec<u8> {
    const KIND: ColumnKind = ColumnKind::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(Some(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ValueExtractionError> {
        extract_bytes(value)
    }

    fn null_value() -> Value {
        Value::Bytes(None)
    }
}

impl FieldValue for serde_json::Value {
    const KIND: ColumnKind = ColumnKind::Json;

    fn to_value(&self) -> Value {
        Value::Json(Some(Box::new(self.clone())))
    }

    fn from_value(value: Value) -> Result<Self, ValueExtractionError> {
        extract_json(value)
    }

    fn null_value() -> Value {
        Value::Json(None)
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: ColumnKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => T::null_value(),
        }
    }

    fn from_value(value: Value) -> Result<Self, ValueExtractionError> {
        if is_null(&value) {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }

    fn null_value() -> Value {
        T::null_value()
    }
}
