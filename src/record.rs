//! `Record<T>`: an entity value plus what Keel knows about its row.
//!
//! A record wraps the caller's plain struct (reachable through `Deref` /
//! `DerefMut`) together with a snapshot of the column values last loaded or
//! persisted, the extra result columns that matched no field, and the
//! entity's descriptor. Updates are diffed against the snapshot, so only
//! changed columns are written.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

use chrono::Utc;
use sea_query::Value;

use crate::descriptor::{ColumnRole, EntityDescriptor};
use crate::entity::Entity;
use crate::error::{KeelError, Result};
use crate::executor::Executor;
use crate::query::{DeleteBuilder, SelectBuilder, UpdateBuilder};
use crate::value::is_null;

pub struct Record<T: 'static> {
    entity: T,
    snapshot: Vec<Option<Value>>,
    extras: HashMap<String, Value>,
    descriptor: &'static EntityDescriptor<T>,
}

impl<T: Entity> Record<T> {
    /// Wrap a caller-built value with an empty snapshot.
    ///
    /// Identity operations then use the value's current primary key.
    ///
    /// # Errors
    ///
    /// Returns the descriptor error if `T`'s declaration is invalid.
    pub fn from_entity(entity: T) -> Result<Self> {
        let descriptor = T::descriptor()?;
        Ok(Self {
            entity,
            snapshot: vec![None; descriptor.columns().len()],
            extras: HashMap::new(),
            descriptor,
        })
    }

    pub(crate) fn from_parts(
        entity: T,
        snapshot: Vec<Option<Value>>,
        extras: HashMap<String, Value>,
        descriptor: &'static EntityDescriptor<T>,
    ) -> Self {
        Self {
            entity,
            snapshot,
            extras,
            descriptor,
        }
    }

    pub fn entity(&self) -> &T {
        &self.entity
    }

    pub fn into_entity(self) -> T {
        self.entity
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor<T> {
        self.descriptor
    }

    /// Raw value of a result column that matched no field, e.g. a computed alias.
    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.extras.get(name)
    }

    pub fn extras(&self) -> &HashMap<String, Value> {
        &self.extras
    }

    /// Loaded columns whose current value differs from the snapshot,
    /// as `(column index, current value)`.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Mapping`] if a field cannot be read.
    pub fn changed_columns(&self) -> Result<Vec<(usize, Value)>> {
        let mut changed = Vec::new();
        for (idx, (column, previous)) in self
            .descriptor
            .columns()
            .iter()
            .zip(&self.snapshot)
            .enumerate()
        {
            let Some(previous) = previous else {
                continue;
            };
            let current = column.get(&self.entity)?;
            if &current != previous {
                changed.push((idx, current));
            }
        }
        Ok(changed)
    }

    /// Whether any loaded column changed since it was loaded or persisted.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Mapping`] if a field cannot be read.
    pub fn is_dirty(&self) -> Result<bool> {
        Ok(!self.changed_columns()?.is_empty())
    }

    /// Encoded primary-key values: snapshot first, then the current field.
    fn identity(&self, operation: &str) -> Result<Vec<(String, Value)>> {
        let primary_key = self.descriptor.require_primary_key(operation)?;
        primary_key
            .iter()
            .map(|&idx| {
                let column = &self.descriptor.columns()[idx];
                let value = match &self.snapshot[idx] {
                    Some(value) => value.clone(),
                    None => column.get(&self.entity)?,
                };
                if is_null(&value) {
                    return Err(KeelError::build(format!(
                        "`{operation}` on `{}` needs a non-NULL value for primary key `{}`",
                        self.descriptor.table_name(),
                        column.name()
                    )));
                }
                Ok((column.name().to_string(), column.encode(value)?))
            })
            .collect()
    }

    /// Read the row again by primary key. `None` if it no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Descriptor`] without a primary key,
    /// [`KeelError::Build`] for a NULL key, and execution or mapping errors.
    pub fn refetch<X: Executor + ?Sized>(&self, executor: &X) -> Result<Option<Record<T>>> {
        let identity = self.identity("refetch")?;
        SelectBuilder::<T>::new().identity(&identity).first(executor)
    }

    /// Write changed columns back by primary key.
    ///
    /// An `UpdatedTimestamp` column the caller left alone is refreshed to the
    /// current time. With nothing changed no statement is issued and `Ok(0)`
    /// is returned. On success the snapshot is refreshed.
    ///
    /// # Errors
    ///
    /// Same as [`refetch`](Self::refetch), plus build errors from the update.
    pub fn update<X: Executor + ?Sized>(&mut self, executor: &X) -> Result<u64> {
        let identity = self.identity("update")?;
        let mut changes = self.changed_columns()?;
        if changes.is_empty() {
            log::debug!("update of `{}` skipped: nothing changed", self.descriptor.table_name());
            return Ok(0);
        }

        let now = Value::BigInt(Some(Utc::now().timestamp()));
        let mut stamped = Vec::new();
        for (idx, column) in self.descriptor.columns().iter().enumerate() {
            if column.role() == ColumnRole::UpdatedTimestamp && !changes.iter().any(|(i, _)| *i == idx) {
                stamped.push(idx);
                changes.push((idx, now.clone()));
            }
        }

        let mut update = UpdateBuilder::<T>::new();
        for (idx, value) in &changes {
            update.set(self.descriptor.columns()[*idx].name(), value.clone());
        }
        update.identity(&identity);
        let affected = update.execute(executor)?;

        for (idx, value) in changes {
            self.snapshot[idx] = Some(value);
        }
        // The entity only takes the new stamp once the row is written.
        for idx in stamped {
            let column = &self.descriptor.columns()[idx];
            column.assign(&mut self.entity, now.clone())?;
            self.snapshot[idx] = Some(column.get(&self.entity)?);
        }
        Ok(affected)
    }

    /// Alias of [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub fn save<X: Executor + ?Sized>(&mut self, executor: &X) -> Result<u64> {
        self.update(executor)
    }

    /// Delete the row by primary key.
    ///
    /// # Errors
    ///
    /// Same as [`refetch`](Self::refetch).
    pub fn delete<X: Executor + ?Sized>(&self, executor: &X) -> Result<u64> {
        let identity = self.identity("delete")?;
        DeleteBuilder::<T>::new().identity(&identity).execute(executor)
    }
}

impl<T> Deref for Record<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entity
    }
}

impl<T> DerefMut for Record<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.entity
    }
}

impl<T: Clone> Clone for Record<T> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity.clone(),
            snapshot: self.snapshot.clone(),
            extras: self.extras.clone(),
            descriptor: self.descriptor,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Record<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.descriptor.table_name())
            .field("entity", &self.entity)
            .field("extras", &self.extras)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorBuilder;
    use crate::mapper::map_row;
    use crate::row::Row;
    use crate::test_helpers::{member_columns, member_row, Member, MockExecutor};

    fn loaded(id: i64, name: &str) -> Record<Member> {
        let columns = member_columns().iter().map(|c| c.to_string()).collect();
        map_row(Member::descriptor().unwrap(), Row::new(columns, member_row(id, name, 100, 100))).unwrap()
    }

    #[test]
    fn test_update_writes_only_changed_columns() {
        let mock = MockExecutor::new();
        let mut record = loaded(1, "John");
        record.name = "Nick".to_string();
        assert!(record.is_dirty().unwrap());

        assert_eq!(record.update(&mock).unwrap(), 1);
        let (sql, params) = mock.statements().remove(0);
        assert_eq!(sql, "UPDATE `member` SET `name` = ?, `updatedOn` = ? WHERE (`id` = ?)");
        assert_eq!(params[0], Value::from("Nick"));
        assert!(matches!(params[1], Value::BigInt(Some(secs)) if secs > 100));
        assert_eq!(params[2], Value::BigInt(Some(1)));
        assert!(record.updated_on > 100);
        assert!(!record.is_dirty().unwrap());
    }

    #[test]
    fn test_failed_update_leaves_record_untouched() {
        let mock = MockExecutor::new();
        let mut record = loaded(1, "John");
        record.name = "Nick".to_string();
        mock.fail_next("locked");

        let err = record.update(&mock).unwrap_err();
        assert!(err.is_execution());
        assert_eq!(record.updated_on, 100);
        assert_eq!(record.name, "Nick");

        let pending: Vec<usize> = record.changed_columns().unwrap().into_iter().map(|(idx, _)| idx).collect();
        let name_idx = Member::descriptor().unwrap().column_index("name").unwrap();
        assert_eq!(pending, vec![name_idx]);

        assert_eq!(record.update(&mock).unwrap(), 1);
        assert!(record.updated_on > 100);
        assert!(!record.is_dirty().unwrap());
    }

    #[test]
    fn test_update_without_changes_issues_nothing() {
        let mock = MockExecutor::new();
        let mut record = loaded(1, "John");
        assert_eq!(record.save(&mock).unwrap(), 0);
        assert!(mock.statements().is_empty());
    }

    #[test]
    fn test_explicit_updated_timestamp_is_kept() {
        let mock = MockExecutor::new();
        let mut record = loaded(1, "John");
        record.updated_on = 5;
        record.update(&mock).unwrap();
        let (sql, params) = mock.statements().remove(0);
        assert_eq!(sql, "UPDATE `member` SET `updatedOn` = ? WHERE (`id` = ?)");
        assert_eq!(params[0], Value::BigInt(Some(5)));
    }

    #[test]
    fn test_changed_primary_key_uses_loaded_identity() {
        let mock = MockExecutor::new();
        let mut record = loaded(1, "John");
        record.id = 9;
        record.update(&mock).unwrap();
        let (sql, params) = mock.statements().remove(0);
        assert!(sql.starts_with("UPDATE `member` SET `id` = ?"));
        assert_eq!(params.first(), Some(&Value::BigInt(Some(9))));
        assert_eq!(params.last(), Some(&Value::BigInt(Some(1))));
    }

    #[test]
    fn test_delete_and_refetch_by_key() {
        let mock = MockExecutor::new();
        let record = loaded(4, "John");
        assert!(record.refetch(&mock).unwrap().is_none());
        assert_eq!(record.delete(&mock).unwrap(), 1);
        assert_eq!(
            mock.captured_sql(),
            vec![
                "SELECT * FROM `member` WHERE (`id` = ?) LIMIT 1".to_string(),
                "DELETE FROM `member` WHERE (`id` = ?)".to_string(),
            ]
        );
    }

    #[test]
    fn test_from_entity_uses_current_key() {
        let mock = MockExecutor::new();
        let record = Record::from_entity(Member {
            id: 12,
            ..Member::default()
        })
        .unwrap();
        assert!(!record.is_dirty().unwrap());
        record.delete(&mock).unwrap();
        assert_eq!(mock.statements()[0].1, vec![Value::BigInt(Some(12))]);
    }

    #[derive(Debug, Default)]
    struct Keyless {
        total: i64,
    }

    impl Entity for Keyless {
        fn declare() -> DescriptorBuilder<Self> {
            DescriptorBuilder::<Self>::new("totals").column("total", |k| &k.total, |k| &mut k.total)
        }
    }

    #[test]
    fn test_identity_operations_need_primary_key() {
        let mock = MockExecutor::new();
        let record = Record::from_entity(Keyless { total: 3 }).unwrap();
        assert!(matches!(record.delete(&mock), Err(KeelError::Descriptor { .. })));
        assert!(matches!(record.refetch(&mock), Err(KeelError::Descriptor { .. })));
        assert!(mock.statements().is_empty());
    }

    #[derive(Debug, Default)]
    struct Nullable {
        id: Option<i64>,
        name: String,
    }

    impl Entity for Nullable {
        fn declare() -> DescriptorBuilder<Self> {
            DescriptorBuilder::<Self>::new("nullable")
                .primary_key("id", |n| &n.id, |n| &mut n.id)
                .column("name", |n| &n.name, |n| &mut n.name)
        }
    }

    #[test]
    fn test_null_identity_is_build_error() {
        let mock = MockExecutor::new();
        let record = Record::from_entity(Nullable::default()).unwrap();
        assert!(matches!(record.delete(&mock), Err(KeelError::Build(_))));
        assert!(mock.statements().is_empty());
    }
}
