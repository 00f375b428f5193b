//! Schemaless, revision-stamped document collections on a relational backend.
//!
//! This crate is the primary entry point for users of sqldoc. It re-exports the core
//! types from `sqldoc-core` and the SQLite connector.
//!
//! # Features
//!
//! - **Schemaless documents** - Store any [`bson::Document`]; filter on any top-level
//!   string, integer, boolean or null property
//! - **Revisioned writes** - Every write gets a new revision; `origin` records the first
//!   write and history can be kept per collection
//! - **Transactional write protocol** - Write, index and commit run in one backend
//!   transaction
//! - **Optional models** - Bind a serde type to validate writes and fill defaults on read
//!
//! # Quick Start
//!
//! ```ignore
//! use sqldoc::{prelude::*, bson::doc};
//!
//! let store = DocumentStore::new(SqliteConnector::open_in_memory()?);
//! let people = store.collection("people")?;
//!
//! let ada = people.insert(doc! { "name": "ada", "age": 30 })?;
//! let id = ada.get_str("id")?;
//!
//! people.update(id, doc! { "name": "ada", "age": 31 })?;
//!
//! let adults = people.find(
//!     Query::builder()
//!         .filter(Filter::eq("name", "ada"))
//!         .and(Filter::gt("age", 18))
//!         .build(),
//! )?;
//! ```
//!
//! # Models
//!
//! ```ignore
//! use sqldoc::prelude::*;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! pub struct Person {
//!     #[serde(default)]
//!     pub id: Option<String>,
//!     pub name: String,
//!     pub age: i64,
//! }
//!
//! impl Model for Person {
//!     fn model_name() -> &'static str { "person" }
//!     fn collection_name() -> &'static str { "people" }
//! }
//!
//! let people = store.typed_collection::<Person>()?;
//! let ada = people.insert(&Person { name: "ada".into(), age: 30, ..Person::default() })?;
//! ```
//!
//! # Dynamic Dispatch
//!
//! [`DocumentStore::into_dyn`](store::DocumentStore::into_dyn) boxes the connector so the
//! backend can be chosen at runtime.

pub mod prelude;

pub use sqldoc_core::{
    collection, config, connector, document, error, index, model, page, query, stamp, statement,
    store, translate,
};

// Re-export BSON types for convenience
pub use bson;

/// SQLite connector.
///
/// This module is only available when the `sqlite` feature is enabled.
#[cfg(feature = "sqlite")]
pub mod sqlite {
    pub use sqldoc_sqlite::{SqliteConnector, SqliteConnectorBuilder};
}
