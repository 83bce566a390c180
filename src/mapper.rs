//! Row mapper: raw rows to [`Record`]s.
//!
//! Result columns are matched to descriptor columns by name (exact, then
//! ASCII case-insensitive) and assigned through the column's converter.
//! Columns with no match land in the record's extras untouched.

use std::collections::HashMap;

use crate::descriptor::EntityDescriptor;
use crate::entity::Entity;
use crate::error::Result;
use crate::record::Record;
use crate::row::Row;

/// Map one row.
///
/// # Errors
///
/// Returns [`KeelError::Mapping`](crate::KeelError::Mapping) when a NULL
/// reaches a non-nullable column or a converter rejects a value.
pub fn map_row<T: Entity>(descriptor: &'static EntityDescriptor<T>, row: Row) -> Result<Record<T>> {
    let mut entity = T::default();
    let mut loaded = vec![false; descriptor.columns().len()];
    let mut extras = HashMap::new();

    for (name, raw) in row.into_pairs() {
        match descriptor.column_index(&name) {
            Some(idx) => {
                descriptor.columns()[idx].assign(&mut entity, raw)?;
                loaded[idx] = true;
            }
            None => {
                extras.insert(name, raw);
            }
        }
    }

    let snapshot = descriptor
        .columns()
        .iter()
        .zip(&loaded)
        .map(|(column, &was_loaded)| {
            if was_loaded {
                column.get(&entity).map(Some)
            } else {
                Ok(None)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Record::from_parts(entity, snapshot, extras, descriptor))
}

/// Map every row, failing on the first error.
///
/// # Errors
///
/// See [`map_row`].
pub fn map_rows<T: Entity>(descriptor: &'static EntityDescriptor<T>, rows: Vec<Row>) -> Result<Vec<Record<T>>> {
    rows.into_iter().map(|row| map_row(descriptor, row)).collect()
}
