//! Convenient re-exports of commonly used types from sqldoc.
//!
//! ```ignore
//! use sqldoc::prelude::*;
//! ```

pub use sqldoc_core::{
    collection::{Collection, Selector, TypedCollection},
    config::CollectionOptions,
    connector::{Connector, ConnectorBuilder, Executor},
    document::{Metadata, Model, ModelExt},
    error::{DocumentStoreError, DocumentStoreResult},
    index::IndexKind,
    page::{Page, PaginationParams},
    query::{Comparison, Conjunction, FieldOp, Filter, Query, QueryBuilder, Sort, SortDirection},
    store::{DocumentStore, DynDocumentStore},
};

#[cfg(feature = "sqlite")]
pub use sqldoc_sqlite::SqliteConnector;
