use serde::{Deserialize, Serialize};
use sqldoc::{
    prelude::*,
    statement::{Statement, quote_identifier},
};

pub fn store() -> DocumentStore<SqliteConnector> {
    DocumentStore::new(SqliteConnector::open_in_memory().unwrap()).with_model::<Person>()
}

/// Number of primary-table rows stored for `id`, committed or not.
pub fn stored_rows(store: &DocumentStore<SqliteConnector>, collection: &str, id: &str) -> i64 {
    scalar(
        store,
        Statement::new(format!(
            "SELECT COUNT(*) FROM {} WHERE id = ?",
            quote_identifier(collection)
        ))
        .bind(id),
    )
}

pub fn scalar(store: &DocumentStore<SqliteConnector>, statement: Statement) -> i64 {
    store
        .connector()
        .query(&statement)
        .unwrap()
        .fetch()
        .unwrap()
        .integer(0)
        .unwrap()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub city: String,
    pub zip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
    pub name: String,
    pub age: i64,
    pub tags: Vec<String>,
    pub address: Address,
}

impl Default for Person {
    fn default() -> Self {
        Self {
            id: None,
            revision: None,
            name: String::new(),
            age: 0,
            tags: Vec::new(),
            address: Address { city: "unknown".into(), zip: String::new() },
        }
    }
}

impl Model for Person {
    fn model_name() -> &'static str {
        "person"
    }

    fn collection_name() -> &'static str {
        "people"
    }
}
