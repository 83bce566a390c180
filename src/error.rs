//! Error types shared by every Keel operation.
//!
//! Keel surfaces five failure classes and never swallows or retries any of them:
//!
//! - [`KeelError::Descriptor`] - malformed entity declaration, or an identity
//!   operation on an entity without a primary key
//! - [`KeelError::Build`] - invalid builder usage
//! - [`KeelError::Execution`] - the executor failed; the driver error is kept as `source()`
//! - [`KeelError::Mapping`] - a result row could not be converted into the entity
//! - [`KeelError::Hook`] - a before-insert hook failed; no statement was issued

use std::fmt;

/// Boxed error returned by executors and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = KeelError> = std::result::Result<T, E>;

/// Keel error type
#[derive(Debug)]
pub enum KeelError {
    /// Malformed entity declaration or missing identity
    Descriptor {
        entity: &'static str,
        message: String,
    },
    /// Invalid builder usage
    Build(String),
    /// Failure reported by the executor
    Execution { sql: String, source: BoxError },
    /// A raw row value could not be assigned to an entity field
    Mapping { column: String, message: String },
    /// A before-insert hook failed
    Hook { table: String, source: BoxError },
}

impl KeelError {
    pub(crate) fn descriptor<T>(message: impl Into<String>) -> Self {
        KeelError::Descriptor {
            entity: std::any::type_name::<T>(),
            message: message.into(),
        }
    }

    pub(crate) fn build(message: impl Into<String>) -> Self {
        KeelError::Build(message.into())
    }

    pub(crate) fn mapping(column: impl Into<String>, message: impl Into<String>) -> Self {
        KeelError::Mapping {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for errors raised by the executor.
    #[must_use]
    pub fn is_execution(&self) -> bool {
        matches!(self, KeelError::Execution { .. })
    }
}

impl fmt::Display for KeelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeelError::Descriptor { entity, message } => {
                write!(f, "Descriptor error for {entity}: {message}")
            }
            KeelError::Build(msg) => write!(f, "Build error: {msg}"),
            KeelError::Execution { sql, source } => {
                write!(f, "Execution error: {source} (sql: {sql})")
            }
            KeelError::Mapping { column, message } => {
                write!(f, "Mapping error on column {column}: {message}")
            }
            KeelError::Hook { table, source } => {
                write!(f, "Before-insert hook for {table} failed: {source}")
            }
        }
    }
}

impl std::error::Error for KeelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeelError::Execution { source, .. } | KeelError::Hook { source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_variants() {
        let err = KeelError::build("page size must be positive");
        assert!(err.to_string().contains("Build error"));
        assert!(err.to_string().contains("page size must be positive"));

        let err = KeelError::mapping("name", "NULL in non-nullable column");
        assert!(err.to_string().contains("column name"));

        let err = KeelError::descriptor::<String>("column `id` declared twice");
        assert!(err.to_string().contains("alloc::string::String"));
    }

    #[test]
    fn test_execution_preserves_source() {
        let err = KeelError::Execution {
            sql: "SELECT 1".to_string(),
            source: "connection reset".into(),
        };
        assert!(err.is_execution());
        assert_eq!(err.source().map(|s| s.to_string()), Some("connection reset".to_string()));
        assert!(err.to_string().contains("SELECT 1"));
    }

    #[test]
    fn test_hook_preserves_source() {
        let err = KeelError::Hook {
            table: "member".to_string(),
            source: "validation failed".into(),
        };
        assert!(!err.is_execution());
        assert_eq!(err.source().map(|s| s.to_string()), Some("validation failed".to_string()));
    }

    #[test]
    fn test_build_has_no_source() {
        assert!(KeelError::build("x").source().is_none());
    }
}
