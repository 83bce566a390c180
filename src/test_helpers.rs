//! Shared fixtures for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use sea_query::Value;

use crate::descriptor::DescriptorBuilder;
use crate::entity::Entity;
use crate::error::BoxError;
use crate::executor::{Executor, InsertOutcome};
use crate::row::Row;

/// Captures every statement and replays queued result sets.
pub(crate) struct MockExecutor {
    captured: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    results: Arc<Mutex<VecDeque<Vec<Row>>>>,
    insert_ids: Arc<Mutex<VecDeque<u64>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MockExecutor {
    pub(crate) fn new() -> Self {
        Self {
            captured: Arc::new(Mutex::new(Vec::new())),
            results: Arc::new(Mutex::new(VecDeque::new())),
            insert_ids: Arc::new(Mutex::new(VecDeque::new())),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Queue one result set for the next `query` call.
    pub(crate) fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect::<Vec<_>>().into();
        let rows = rows
            .into_iter()
            .map(|values| Row::with_columns(Arc::clone(&columns), values))
            .collect();
        self.results.lock().unwrap().push_back(rows);
    }

    pub(crate) fn push_insert_id(&self, id: u64) {
        self.insert_ids.lock().unwrap().push_back(id);
    }

    /// Make the next call fail with `message`.
    pub(crate) fn fail_next(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.captured.lock().unwrap().clone()
    }

    pub(crate) fn captured_sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|(sql, _)| sql).collect()
    }

    fn record(&self, sql: &str, params: &[Value]) -> Result<(), BoxError> {
        self.captured.lock().unwrap().push((sql.to_string(), params.to_vec()));
        match self.failure.lock().unwrap().take() {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    }
}

impl Executor for MockExecutor {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, BoxError> {
        self.record(sql, params)?;
        Ok(1)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, BoxError> {
        self.record(sql, params)?;
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }

    fn execute_insert(&self, sql: &str, params: &[Value]) -> Result<InsertOutcome, BoxError> {
        self.record(sql, params)?;
        Ok(InsertOutcome {
            rows_affected: 1,
            last_insert_id: self.insert_ids.lock().unwrap().pop_front(),
        })
    }
}

/// The `member` table used throughout the unit tests.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Member {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) created_on: i64,
    pub(crate) updated_on: i64,
}

impl Entity for Member {
    fn declare() -> DescriptorBuilder<Self> {
        DescriptorBuilder::<Self>::new("member")
            .primary_key("id", |m| &m.id, |m| &mut m.id)
            .column("name", |m| &m.name, |m| &mut m.name)
            .created_timestamp("createdOn", |m| &m.created_on, |m| &mut m.created_on)
            .updated_timestamp("updatedOn", |m| &m.updated_on, |m| &mut m.updated_on)
    }
}

pub(crate) fn member_columns() -> [&'static str; 4] {
    ["id", "name", "createdOn", "updatedOn"]
}

pub(crate) fn member_row(id: i64, name: &str, created_on: i64, updated_on: i64) -> Vec<Value> {
    vec![
        Value::BigInt(Some(id)),
        Value::String(Some(name.to_string())),
        Value::BigInt(Some(created_on)),
        Value::BigInt(Some(updated_on)),
    ]
}
