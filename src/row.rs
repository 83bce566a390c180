//! Raw result rows as returned by an [`Executor`](crate::Executor).

use std::sync::Arc;

use sea_query::Value;

use crate::error::{KeelError, Result};
use crate::value::FieldValue;

/// One result row: ordered column labels paired with raw values.
///
/// Rows from the same result set share their column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row from owned column labels and values of the same length.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self::with_columns(Arc::from(columns), values)
    }

    /// Build a row that shares its column labels with sibling rows.
    pub fn with_columns(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len(), "row width mismatch");
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of the first column labelled `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Convert the named column into a field type.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Mapping`] if the column is absent or its value
    /// cannot be converted.
    pub fn try_get<T: FieldValue>(&self, name: &str) -> Result<T> {
        let value = self
            .get_by_name(name)
            .ok_or_else(|| KeelError::mapping(name, "column not present in result"))?;
        T::from_value(value.clone()).map_err(|e| KeelError::mapping(name, e.to_string()))
    }

    /// Iterate `(label, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    /// Consume the row into owned `(label, value)` pairs.
    pub fn into_pairs(self) -> Vec<(String, Value)> {
        let Row { columns, values } = self;
        columns.iter().cloned().zip(values).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row::new(
            vec!["id".to_string(), "name".to_string()],
            vec![Value::BigInt(Some(1)), Value::String(Some("John".to_string()))],
        )
    }

    #[test]
    fn test_lookup_by_name_and_index() {
        let row = sample();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(&Value::BigInt(Some(1))));
        assert_eq!(row.get_by_name("name"), Some(&Value::String(Some("John".to_string()))));
        assert!(row.get_by_name("missing").is_none());
    }

    #[test]
    fn test_try_get_converts() {
        let row = sample();
        assert_eq!(row.try_get::<i32>("id").unwrap(), 1);
        assert!(matches!(row.try_get::<i64>("nope"), Err(KeelError::Mapping { .. })));
    }

    #[test]
    fn test_shared_columns() {
        let columns: Arc<[String]> = Arc::from(vec!["n".to_string()]);
        let a = Row::with_columns(Arc::clone(&columns), vec![Value::Int(Some(1))]);
        let b = Row::with_columns(columns, vec![Value::Int(Some(2))]);
        assert_eq!(a.columns(), b.columns());
        let pairs = b.into_pairs();
        assert_eq!(pairs, vec![("n".to_string(), Value::Int(Some(2)))]);
    }
}
