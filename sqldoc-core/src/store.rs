//! Main document store interface.
//!
//! - [`DocumentStore`] - Store bound to a concrete [`Connector`]
//! - [`DynDocumentStore`] - Store over a boxed connector chosen at runtime
//!
//! Opening a collection creates its tables if they do not exist yet.
//!
//! # Example
//!
//! ```ignore
//! use sqldoc::prelude::*;
//!
//! let store = DocumentStore::new(SqliteConnector::open_in_memory()?)
//!     .with_model::<Person>();
//!
//! let people = store.collection_with_options(
//!     "people",
//!     CollectionOptions::new().with_model("person"),
//! )?;
//! let typed = store.typed_collection::<Person>()?;
//! ```

use std::sync::Arc;

use log::debug;

use crate::{
    collection::{Collection, TypedCollection},
    config::CollectionOptions,
    connector::{Connector, in_transaction},
    document::Model,
    error::DocumentStoreResult,
    model::{ModelRegistry, ModelSchema, ModelType},
    statement::{Tables, Template},
};

/// A document store over one backend connection.
#[derive(Debug)]
pub struct DocumentStore<C: Connector> {
    connector: C,
    models: ModelRegistry,
}

/// A document store whose connector type is only known at runtime.
pub type DynDocumentStore = DocumentStore<Box<dyn Connector>>;

impl<C: Connector> DocumentStore<C> {
    /// Creates a store with no registered models.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = DocumentStore::new(SqliteConnector::open("documents.db")?);
    /// ```
    pub fn new(connector: C) -> Self {
        Self { connector, models: ModelRegistry::new() }
    }

    /// Registers `M` so collection options can refer to it by name.
    pub fn with_model<M: Model>(mut self) -> Self {
        self.register_model::<M>();
        self
    }

    /// Registers `M` in place. See [`with_model`](Self::with_model).
    pub fn register_model<M: Model>(&mut self) {
        self.models.register::<M>();
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// The backend connection, for statements outside the collection API.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Opens `name` with default options.
    pub fn collection(&self, name: &str) -> DocumentStoreResult<Collection<'_, C>> {
        self.collection_with_options(name, CollectionOptions::default())
    }

    /// Opens `name`, creating its tables if needed.
    ///
    /// # Errors
    ///
    /// Returns a [configuration error](crate::error::DocumentStoreError::Configuration)
    /// for an invalid or colliding collection name or an unregistered model, before
    /// touching the backend.
    pub fn collection_with_options(
        &self,
        name: &str,
        options: CollectionOptions,
    ) -> DocumentStoreResult<Collection<'_, C>> {
        let tables = Tables::for_collection(name)?;
        let model = options
            .model
            .as_deref()
            .map(|model| self.models.resolve(model))
            .transpose()?;

        self.bootstrap(&tables)?;

        Ok(Collection::new(&self.connector, tables, options, model))
    }

    /// Opens `M`'s collection with `M` bound as its model.
    pub fn typed_collection<M: Model>(&self) -> DocumentStoreResult<TypedCollection<'_, C, M>> {
        self.typed_collection_with_options::<M>(CollectionOptions::default())
    }

    /// Like [`typed_collection`](Self::typed_collection). Any model named in `options`
    /// is replaced by `M`.
    pub fn typed_collection_with_options<M: Model>(
        &self,
        options: CollectionOptions,
    ) -> DocumentStoreResult<TypedCollection<'_, C, M>> {
        let tables = Tables::for_collection(M::collection_name())?;
        let model: Arc<dyn ModelSchema> = Arc::new(ModelType::<M>::new());

        self.bootstrap(&tables)?;

        Ok(TypedCollection::new(Collection::new(
            &self.connector,
            tables,
            options.with_model(M::model_name()),
            Some(model),
        )))
    }

    /// Drops both tables of `name`. Dropping a missing collection is not an error.
    pub fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let tables = Tables::for_collection(name)?;

        in_transaction(&self.connector, |executor| {
            executor.execute(&tables.statement(Template::DropIndexTable))?;
            executor.execute(&tables.statement(Template::DropDocumentTable))?;
            Ok(())
        })?;

        debug!("dropped collection {name}");

        Ok(())
    }

    /// Boxes the connector, keeping registered models.
    pub fn into_dyn(self) -> DynDocumentStore
    where
        C: 'static,
    {
        DocumentStore {
            connector: Box::new(self.connector),
            models: self.models,
        }
    }

    fn bootstrap(&self, tables: &Tables) -> DocumentStoreResult<()> {
        in_transaction(&self.connector, |executor| {
            for template in [
                Template::CreateDocumentTable,
                Template::CreateIndexTable,
                Template::CreateIndexLookup,
            ] {
                executor.execute(&tables.statement(template))?;
            }
            Ok(())
        })
    }
}
