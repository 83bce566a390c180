//! Lenient extraction of Rust scalars from raw `sea_query::Value`s.
//!
//! Drivers disagree on integer widths: SQLite hands back every integer as
//! `BigInt`, MySQL may report `Unsigned`, and text protocols deliver numbers
//! as strings. Extraction therefore accepts any integer variant and range-checks
//! the result instead of insisting on one exact variant.

use sea_query::Value;

/// Error type for value extraction failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExtractionError {
    /// The value is null (None variant)
    NullValue,
    /// The value type doesn't match the expected type
    TypeMismatch { expected: String, actual: String },
    /// Value conversion failed (e.g., overflow, invalid UTF-8, malformed JSON)
    ConversionError(String),
}

impl std::fmt::Display for ValueExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueExtractionError::NullValue => write!(f, "Value is null"),
            ValueExtractionError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {expected}, got {actual}")
            }
            ValueExtractionError::ConversionError(msg) => write!(f, "Conversion error: {msg}"),
        }
    }
}

impl std::error::Error for ValueExtractionError {}

/// Returns `true` when `value` is the null variant of any type.
#[must_use]
pub fn is_null(value: &Value) -> bool {
    matches!(
        value,
        Value::Bool(None)
            | Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::TinyUnsigned(None)
            | Value::SmallUnsigned(None)
            | Value::Unsigned(None)
            | Value::BigUnsigned(None)
            | Value::Float(None)
            | Value::Double(None)
            | Value::String(None)
            | Value::Char(None)
            | Value::Bytes(None)
            | Value::Json(None)
    )
}

/// The NULL that executors hand back for a column whose type they do not know.
#[must_use]
pub fn untyped_null() -> Value {
    Value::String(None)
}

/// Short variant name for error messages.
#[must_use]
pub fn variant_name(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "Bool",
        Value::TinyInt(_) => "TinyInt",
        Value::SmallInt(_) => "SmallInt",
        Value::Int(_) => "Int",
        Value::BigInt(_) => "BigInt",
        Value::TinyUnsigned(_) => "TinyUnsigned",
        Value::SmallUnsigned(_) => "SmallUnsigned",
        Value::Unsigned(_) => "Unsigned",
        Value::BigUnsigned(_) => "BigUnsigned",
        Value::Float(_) => "Float",
        Value::Double(_) => "Double",
        Value::String(_) => "String",
        Value::Char(_) => "Char",
        Value::Bytes(_) => "Bytes",
        Value::Json(_) => "Json",
        _ => "Other",
    }
}

fn mismatch(expected: &str, value: &Value) -> ValueExtractionError {
    ValueExtractionError::TypeMismatch {
        expected: expected.to_string(),
        actual: variant_name(value).to_string(),
    }
}

fn overflow(value: impl std::fmt::Display, target: &str) -> ValueExtractionError {
    ValueExtractionError::ConversionError(format!("{value} does not fit in {target}"))
}

/// Extract a signed integer from any integer, boolean or numeric-text value.
pub fn extract_i64(value: &Value) -> Result<i64, ValueExtractionError> {
    match value {
        Value::TinyInt(Some(v)) => Ok(i64::from(*v)),
        Value::SmallInt(Some(v)) => Ok(i64::from(*v)),
        Value::Int(Some(v)) => Ok(i64::from(*v)),
        Value::BigInt(Some(v)) => Ok(*v),
        Value::TinyUnsigned(Some(v)) => Ok(i64::from(*v)),
        Value::SmallUnsigned(Some(v)) => Ok(i64::from(*v)),
        Value::Unsigned(Some(v)) => Ok(i64::from(*v)),
        Value::BigUnsigned(Some(v)) => i64::try_from(*v).map_err(|_| overflow(v, "i64")),
        Value::Bool(Some(b)) => Ok(i64::from(*b)),
        Value::String(Some(s)) => s.trim().parse::<i64>().map_err(|_| mismatch("integer", value)),
        v if is_null(v) => Err(ValueExtractionError::NullValue),
        _ => Err(mismatch("integer", value)),
    }
}

/// Extract an unsigned integer, rejecting negative values.
pub fn extract_u64(value: &Value) -> Result<u64, ValueExtractionError> {
    match value {
        Value::BigUnsigned(Some(v)) => Ok(*v),
        Value::String(Some(s)) => s.trim().parse::<u64>().map_err(|_| mismatch("unsigned integer", value)),
        _ => {
            let signed = extract_i64(value)?;
            u64::try_from(signed).map_err(|_| overflow(signed, "u64"))
        }
    }
}

/// Extract a float from any numeric value.
pub fn extract_f64(value: &Value) -> Result<f64, ValueExtractionError> {
    match value {
        Value::Float(Some(v)) => Ok(f64::from(*v)),
        Value::Double(Some(v)) => Ok(*v),
        Value::String(Some(s)) => s.trim().parse::<f64>().map_err(|_| mismatch("float", value)),
        #[allow(clippy::cast_precision_loss)]
        _ => extract_i64(value).map(|v| v as f64),
    }
}

/// Extract a boolean; integers are true when non-zero.
pub fn extract_bool(value: &Value) -> Result<bool, ValueExtractionError> {
    match value {
        Value::Bool(Some(b)) => Ok(*b),
        _ => extract_i64(value).map(|v| v != 0).map_err(|e| match e {
            ValueExtractionError::TypeMismatch { actual, .. } => ValueExtractionError::TypeMismatch {
                expected: "boolean".to_string(),
                actual,
            },
            other => other,
        }),
    }
}

/// Extract owned text; UTF-8 blobs are accepted.
pub fn extract_string(value: Value) -> Result<String, ValueExtractionError> {
    match value {
        Value::String(Some(s)) => Ok(s),
        Value::Char(Some(c)) => Ok(c.to_string()),
        Value::Bytes(Some(b)) => {
            String::from_utf8(b).map_err(|e| ValueExtractionError::ConversionError(e.to_string()))
        }
        v if is_null(&v) => Err(ValueExtractionError::NullValue),
        other => Err(mismatch("text", &other)),
    }
}

/// Extract raw bytes; text is accepted as its UTF-8 encoding.
pub fn extract_bytes(value: Value) -> Result<Vec<u8>, ValueExtractionError> {
    match value {
        Value::Bytes(Some(b)) => Ok(b),
        Value::String(Some(s)) => Ok(s.into_bytes()),
        v if is_null(&v) => Err(ValueExtractionError::NullValue),
        other => Err(mismatch("bytes", &other)),
    }
}

/// Extract a JSON document from a decoded JSON value or from JSON text/blob.
pub fn extract_json(value: Value) -> Result<serde_json::Value, ValueExtractionError> {
    match value {
        Value::Json(Some(j)) => Ok(*j),
        Value::String(Some(s)) => serde_json::from_str(&s)
            .map_err(|e| ValueExtractionError::ConversionError(format!("malformed JSON: {e}"))),
        Value::Bytes(Some(b)) => serde_json::from_slice(&b)
            .map_err(|e| ValueExtractionError::ConversionError(format!("malformed JSON: {e}"))),
        v if is_null(&v) => Err(ValueExtractionError::NullValue),
        other => Err(mismatch("JSON", &other)),
    }
}

/// `true` for NULL or an integer zero: an identity or timestamp Keel or the
/// engine still has to assign.
pub(crate) fn is_unassigned(value: &Value) -> bool {
    if is_null(value) {
        return true;
    }
    match value {
        Value::String(_) | Value::Char(_) | Value::Bytes(_) | Value::Json(_) => false,
        _ => matches!(extract_i64(value), Ok(0)),
    }
}
