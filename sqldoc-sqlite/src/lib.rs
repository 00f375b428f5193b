//! SQLite connector for sqldoc.
//!
//! This crate provides a [`Connector`](sqldoc_core::connector::Connector) over a single
//! `rusqlite` connection with SQLite compiled in. Every statement is prepared (and
//! cached) with its parameters bound; transactions map onto SQLite transactions and roll
//! back whenever the unit of work fails or unwinds.
//!
//! To use this connector through the facade crate, keep the default `sqlite` feature:
//!
//! ```toml
//! [dependencies]
//! sqldoc = { version = "x.y.z" }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use sqldoc::{connector::ConnectorBuilder, sqlite::SqliteConnector, store::DocumentStore};
//!
//! let connector = SqliteConnector::builder()
//!     .with_path("documents.db")
//!     .with_busy_timeout(Duration::from_secs(5))
//!     .build()?;
//!
//! let store = DocumentStore::new(connector);
//! ```

#[allow(unused_extern_crates)]
extern crate self as sqldoc_sqlite;

pub mod connector;

pub use connector::{SqliteConnector, SqliteConnectorBuilder};
