//! Collection types for document store operations.
//!
//! # Collection Types
//!
//! - [`Collection`] - Untyped collection working on [`bson::Document`]s
//! - [`TypedCollection`] - Collection bound to a [`Model`], returning model values
//!
//! # Write protocol
//!
//! `insert` and `update` share one upsert path. Inside a single backend transaction
//! it looks up the id's origin and existing revisions, inserts the new revision
//! uncommitted, replaces the id's index rows, prunes other revisions unless version
//! tracking is on, and finally marks the new revision committed. Model validation runs
//! before the transaction opens, so a rejected write executes no statement.
//!
//! # Example
//!
//! ```ignore
//! let people = store.collection("people")?;
//!
//! let ada = people.insert(doc! { "name": "ada", "age": 30 })?;
//! let id = ada.get_str("id")?;
//!
//! people.update(id, doc! { "name": "ada", "age": 31 })?;
//! let adults = people.find(Query::builder().filter(Filter::gte("age", 18)).build())?;
//! ```

use std::{marker::PhantomData, sync::Arc};

use bson::{Bson, Document};
use log::debug;

use crate::{
    config::CollectionOptions,
    connector::{Connector, Executor, in_transaction},
    document::{self, ID_FIELD, Metadata, Model, ModelExt, RESERVED_FIELDS},
    error::{DocumentStoreError, DocumentStoreResult},
    index::IndexMaintainer,
    model::ModelSchema,
    page::{Page, PaginationParams},
    query::Query,
    stamp,
    statement::{Tables, Template},
    translate::FilterTranslator,
};

/// What a find or count applies to.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selector {
    /// No selector. `find` returns nothing; `count` counts every document.
    #[default]
    All,
    /// A single document id.
    Id(String),
    /// A filter query.
    Query(Query),
}

impl From<Query> for Selector {
    fn from(query: Query) -> Self {
        Selector::Query(query)
    }
}

impl From<&str> for Selector {
    fn from(id: &str) -> Self {
        Selector::Id(id.to_string())
    }
}

impl From<String> for Selector {
    fn from(id: String) -> Self {
        Selector::Id(id)
    }
}

impl From<&String> for Selector {
    fn from(id: &String) -> Self {
        Selector::Id(id.clone())
    }
}

impl<T: Into<Selector>> From<Option<T>> for Selector {
    fn from(selector: Option<T>) -> Self {
        selector.map_or(Selector::All, Into::into)
    }
}

/// An untyped collection over a borrowed connector.
#[derive(Debug)]
pub struct Collection<'a, C: Connector> {
    connector: &'a C,
    tables: Tables,
    options: CollectionOptions,
    model: Option<Arc<dyn ModelSchema>>,
}

impl<'a, C: Connector> Collection<'a, C> {
    pub(crate) fn new(
        connector: &'a C,
        tables: Tables,
        options: CollectionOptions,
        model: Option<Arc<dyn ModelSchema>>,
    ) -> Self {
        Self { connector, tables, options, model }
    }

    /// Collection name. The primary table carries this name and the index table the
    /// same name with an `_index` suffix.
    pub fn name(&self) -> &str {
        self.tables.name()
    }

    /// Options the collection was opened with.
    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    /// Stores `document` under a newly generated id.
    ///
    /// Returns the stored document with its metadata attached, merged onto the model's
    /// default instance when a model is configured.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::InvalidDocument`] if `document` already carries an `id`
    /// - [`DocumentStoreError::TypeMismatch`] if it does not fit the configured model
    /// - [`DocumentStoreError::Backend`] if a statement fails; nothing is written
    pub fn insert(&self, document: Document) -> DocumentStoreResult<Document> {
        if document.contains_key(ID_FIELD) {
            return Err(DocumentStoreError::InvalidDocument(
                "insert does not accept a caller-supplied id, use update".into(),
            ));
        }

        self.upsert(stamp::generate_id(), document)
    }

    /// Writes a new revision of `id`. An unknown id is created.
    ///
    /// # Errors
    ///
    /// Same as [`insert`](Self::insert), with [`DocumentStoreError::InvalidDocument`]
    /// raised for an empty id.
    pub fn update(&self, id: &str, document: Document) -> DocumentStoreResult<Document> {
        if id.is_empty() {
            return Err(DocumentStoreError::InvalidDocument("id must not be empty".into()));
        }

        self.upsert(id.to_string(), document)
    }

    fn upsert(&self, id: String, mut document: Document) -> DocumentStoreResult<Document> {
        if let Some(model) = &self.model {
            model.validate(&document)?;
        }

        let metadata = in_transaction(self.connector, |executor| {
            self.write_revision(executor, &id, &document)
        })?;

        debug!(
            "committed {}/{} revision {}",
            self.name(),
            metadata.id,
            metadata.revision
        );

        metadata.attach(&mut document);
        self.project(document)
    }

    fn write_revision(
        &self,
        executor: &dyn Executor,
        id: &str,
        document: &Document,
    ) -> DocumentStoreResult<Metadata> {
        let latest = executor
            .query(&self.tables.statement(Template::FetchOrigin).bind(id))?
            .fetch();

        let (origin, previous) = match &latest {
            Some(row) => (Some(row.text(0)?), Some(row.text(1)?)),
            None => (None, None),
        };

        let existing = executor
            .query(&self.tables.statement(Template::FetchRevisions).bind(id))?
            .map(|row| row.integer(0))
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        let updated = stamp::next_updated(stamp::now(), previous)?;
        let metadata = Metadata {
            id: id.to_string(),
            revision: stamp::generate_revision(&mut rand::thread_rng(), &existing),
            origin: origin.map_or_else(|| updated.clone(), str::to_string),
            updated,
        };

        let mut stored = document.clone();
        metadata.attach(&mut stored);

        executor.execute(
            &self
                .tables
                .statement(Template::InsertRevision)
                .bind(id)
                .bind(metadata.revision)
                .bind(metadata.updated.as_str())
                .bind(metadata.origin.as_str())
                .bind(document::encode(&stored)?),
        )?;

        for statement in
            IndexMaintainer::replace_statements(&self.tables, id, &metadata.origin, &stored)
        {
            executor.execute(&statement)?;
        }

        if !self.options.version_tracking {
            executor.execute(
                &self
                    .tables
                    .statement(Template::DeleteExceptRevision)
                    .bind(id)
                    .bind(metadata.revision),
            )?;
        }

        executor.execute(
            &self
                .tables
                .statement(Template::CommitRevision)
                .bind(id)
                .bind(metadata.revision),
        )?;

        Ok(metadata)
    }

    /// Removes every revision and index row of `id`. Absent ids are not an error.
    pub fn delete(&self, id: &str) -> DocumentStoreResult<()> {
        let removed = in_transaction(self.connector, |executor| {
            let removed =
                executor.execute(&self.tables.statement(Template::DeleteDocument).bind(id))?;
            executor.execute(&IndexMaintainer::delete_statement(&self.tables, id))?;

            Ok(removed)
        })?;

        debug!("deleted {}/{id} ({removed} revisions)", self.name());

        Ok(())
    }

    /// Finds documents.
    ///
    /// [`Selector::All`] returns nothing rather than scanning the collection. A filter
    /// returns matches in the filter's order, each re-read as its current committed
    /// revision.
    pub fn find(&self, selector: impl Into<Selector>) -> DocumentStoreResult<Vec<Document>> {
        match selector.into() {
            Selector::All => Ok(Vec::new()),
            Selector::Id(id) => Ok(self.get(&id)?.into_iter().collect()),
            Selector::Query(query) => self.find_matching(&query),
        }
    }

    /// Current committed revision of `id`, if any.
    pub fn get(&self, id: &str) -> DocumentStoreResult<Option<Document>> {
        self.fetch_current(id)?
            .map(|document| self.project(document))
            .transpose()
    }

    /// Counts every document, a single id, or the matches of a filter.
    pub fn count(&self, selector: impl Into<Selector>) -> DocumentStoreResult<usize> {
        let statement = match selector.into() {
            Selector::All => self.tables.statement(Template::Count),
            Selector::Id(id) => return Ok(usize::from(self.fetch_current(&id)?.is_some())),
            Selector::Query(query) => {
                FilterTranslator::translate(&self.tables, &query)?.count_statement(&self.tables)
            }
        };

        let count = match self.connector.query(&statement)?.fetch() {
            Some(row) => row.integer(0)?,
            None => 0,
        };

        usize::try_from(count)
            .map_err(|_| DocumentStoreError::Serialization(format!("invalid count {count}")))
    }

    /// One page of the matches of `query`. The query's own limit and offset are replaced.
    /// One page of the matches of `query`, see [`Collection::find_page`].
    pub fn find_page(
        &self,
        query: &Query,
        params: PaginationParams,
    ) -> DocumentStoreResult<Page<Document>> {
        let count = self.count(query.clone())?;
        let items = self.find_matching(&params.apply(query))?;

        Ok(params.page(items, count))
    }

    /// Revisions stored for `id`, newest first.
    ///
    /// Without version tracking this is at most the current revision.
    pub fn revisions(&self, id: &str) -> DocumentStoreResult<Vec<i64>> {
        self.connector
            .query(&self.tables.statement(Template::FetchRevisions).bind(id))?
            .map(|row| row.integer(0))
            .collect()
    }

    fn find_matching(&self, query: &Query) -> DocumentStoreResult<Vec<Document>> {
        let statement =
            FilterTranslator::translate(&self.tables, query)?.fetch_statement(&self.tables);
        let ids = self
            .connector
            .query(&statement)?
            .map(|row| row.text(0).map(str::to_string))
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(document) = self.get(&id)? {
                documents.push(document);
            }
        }

        Ok(documents)
    }

    fn fetch_current(&self, id: &str) -> DocumentStoreResult<Option<Document>> {
        self.connector
            .query(&self.tables.statement(Template::FetchCurrent).bind(id))?
            .fetch()
            .map(|row| document::decode(row.blob(0)?))
            .transpose()
    }

    fn project(&self, document: Document) -> DocumentStoreResult<Document> {
        match &self.model {
            Some(model) => model.project(document),
            None => Ok(document),
        }
    }
}

/// A collection bound to the model `M`.
///
/// Values are serialized to documents on write and merged onto `M::default()` on read,
/// so stored documents missing newer fields still deserialize.
#[derive(Debug)]
pub struct TypedCollection<'a, C: Connector, M: Model> {
    inner: Collection<'a, C>,
    _marker: PhantomData<fn() -> M>,
}

impl<'a, C: Connector, M: Model> TypedCollection<'a, C, M> {
    pub(crate) fn new(inner: Collection<'a, C>) -> Self {
        Self { inner, _marker: PhantomData }
    }

    /// Collection name, taken from [`Model::collection_name`].
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// The underlying untyped collection.
    pub fn untyped(&self) -> &Collection<'a, C> {
        &self.inner
    }

    /// Metadata fields serialized as null (e.g. `id: None`) are left for the store to fill.
    fn to_document(value: &M) -> DocumentStoreResult<Document> {
        let mut document = value.to_document()?;
        for field in RESERVED_FIELDS {
            if matches!(document.get(field), Some(Bson::Null)) {
                document.remove(field);
            }
        }

        Ok(document)
    }

    /// Stores `value` under a new id.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::InvalidDocument`] if `value` serializes with a non-null `id`.
    pub fn insert(&self, value: &M) -> DocumentStoreResult<M> {
        M::from_document(self.inner.insert(Self::to_document(value)?)?)
    }

    /// Writes a new revision of `id`.
    pub fn update(&self, id: &str, value: &M) -> DocumentStoreResult<M> {
        M::from_document(self.inner.update(id, Self::to_document(value)?)?)
    }

    /// Current committed revision of `id` as a model value.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let people = store.typed_collection::<Person>()?;
    /// if let Some(ada) = people.get(&id)? {
    ///     println!("{} is {}", ada.name, ada.age);
    /// }
    /// ```
    pub fn get(&self, id: &str) -> DocumentStoreResult<Option<M>> {
        self.inner.get(id)?.map(M::from_document).transpose()
    }

    /// Finds model values. Selector semantics follow [`Collection::find`].
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::Serialization`] if a stored document cannot be read as `M`
    /// even after merging onto its default.
    pub fn find(&self, selector: impl Into<Selector>) -> DocumentStoreResult<Vec<M>> {
        self.inner
            .find(selector)?
            .into_iter()
            .map(M::from_document)
            .collect()
    }

    /// One page of the matches of `query`, see [`Collection::find_page`].
    pub fn find_page(
        &self,
        query: &Query,
        params: PaginationParams,
    ) -> DocumentStoreResult<Page<M>> {
        self.inner.find_page(query, params)?.try_map(M::from_document)
    }

    /// Counts every document, a single id, or the matches of a filter.
    pub fn count(&self, selector: impl Into<Selector>) -> DocumentStoreResult<usize> {
        self.inner.count(selector)
    }

    /// Removes every revision and index row of `id`.
    pub fn delete(&self, id: &str) -> DocumentStoreResult<()> {
        self.inner.delete(id)
    }

    /// Revisions stored for `id`, newest first.
    pub fn revisions(&self, id: &str) -> DocumentStoreResult<Vec<i64>> {
        self.inner.revisions(id)
    }
}
