//! Schemaless, revision-stamped document collections on top of a relational backend.
//!
//! This crate is the core of the sqldoc project and provides:
//!
//! - **Documents and models** ([`document`], [`model`]) - Reserved metadata, optional
//!   target types and the deep merge onto them
//! - **Connector abstraction** ([`connector`]) - Traits a relational backend implements
//! - **Statement catalog** ([`statement`]) - Named, parameter-bound SQL templates
//! - **Attribute index** ([`index`]) - Entity-attribute-value rows for filtering
//! - **Queries** ([`query`], [`translate`]) - Filter construction and translation to SQL
//! - **Collections** ([`collection`]) - The revisioned write protocol and reads
//! - **Document store** ([`store`]) - Entry point that opens collections
//! - **Configuration** ([`config`]) - Per-collection options
//! - **Pagination** ([`page`]) - Paged results
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use sqldoc_core::{collection::Selector, store::DocumentStore};
//! use bson::doc;
//!
//! let store = DocumentStore::new(connector);
//! let people = store.collection("people")?;
//!
//! let ada = people.insert(doc! { "name": "ada", "age": 30 })?;
//! let found = people.find(ada.get_str("id")?)?;
//! assert_eq!(people.count(Selector::All)?, 1);
//! ```

#[allow(unused_extern_crates)]
extern crate self as sqldoc_core;

pub mod collection;
pub mod config;
pub mod connector;
pub mod document;
pub mod error;
pub mod index;
pub mod model;
pub mod page;
pub mod query;
pub mod stamp;
pub mod statement;
pub mod store;
pub mod translate;

#[cfg(test)]
mod testing;
