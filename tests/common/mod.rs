//! Shared fixtures for the SQLite-backed integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use keel::{DescriptorBuilder, Entity, Executor, SqliteExecutor};

const SCHEMA: &str = "
    CREATE TABLE member (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(255),
        createdOn INTEGER DEFAULT NULL,
        updatedOn INTEGER DEFAULT NULL
    );
    CREATE TABLE x (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(255) NOT NULL,
        y VARCHAR(255) NOT NULL
    );
    CREATE TABLE guarded (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(255) NOT NULL
    );
    CREATE TABLE bag (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        propertiesDump TEXT
    );
";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub created_on: i64,
    pub updated_on: i64,
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

/// Entity whose hook always stamps `y`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct X {
    pub id: i64,
    pub name: String,
    pub y: String,
}

impl Entity for X {
    fn declare() -> DescriptorBuilder<Self> {
        DescriptorBuilder::<Self>::new("x")
            .primary_key("id", |x| &x.id, |x| &mut x.id)
            .column("name", |x| &x.name, |x| &mut x.name)
            .column("y", |x| &x.y, |x| &mut x.y)
            .before_insert(|insert| {
                insert.value("y", "hoge");
                Ok(())
            })
    }
}

/// Entity whose hook refuses rows without a name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Guarded {
    pub id: i64,
    pub name: String,
}

impl Entity for Guarded {
    fn declare() -> DescriptorBuilder<Self> {
        DescriptorBuilder::<Self>::new("guarded")
            .primary_key("id", |g| &g.id, |g| &mut g.id)
            .column("name", |g| &g.name, |g| &mut g.name)
            .before_insert(|insert| {
                if insert.has_value("name") {
                    Ok(())
                } else {
                    Err("name is required".into())
                }
            })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Bag {
    pub id: i64,
    pub properties_dump: BTreeMap<String, String>,
}

impl Entity for Bag {
    fn declare() -> DescriptorBuilder<Self> {
        DescriptorBuilder::<Self>::new("bag")
            .primary_key("id", |b| &b.id, |b| &mut b.id)
            .json_column("propertiesDump", |b| &b.properties_dump, |b| &mut b.properties_dump)
    }
}

pub fn open() -> SqliteExecutor {
    let db = SqliteExecutor::open_in_memory().expect("open in-memory database");
    db.connection().execute_batch(SCHEMA).expect("create schema");
    db
}

/// Insert `count` members named `m1..=m{count}`; ids follow insertion order.
pub fn seed_members(db: &SqliteExecutor, count: u64) {
    for i in 1..=count {
        Member::insert()
            .value("name", format!("m{i}"))
            .execute(db)
            .expect("seed member");
    }
}

pub fn count_rows(db: &SqliteExecutor, table: &str) -> i64 {
    let rows = db
        .query(&format!("SELECT COUNT(*) AS n FROM {table}"), &[])
        .expect("count rows");
    rows[0].try_get::<i64>("n").expect("count column")
}
