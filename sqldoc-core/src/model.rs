//! Target-type binding for collections.
//!
//! A collection may be bound to a [`Model`] through a type-erased [`ModelSchema`].
//! Writes are validated against the model before any statement runs, and results are
//! deep-merged onto the model's default instance.
//!
//! Merge rules ([`deep_merge`]): nested documents merge key by key with the source
//! overwriting the destination, arrays merge position by position with extra source
//! items appended, and any other value overwrites.

use std::{collections::HashMap, fmt::Debug, marker::PhantomData, sync::Arc};

use bson::{Bson, Document};

use crate::{
    document::{Model, ModelExt},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Recursively merges `source` into `destination`.
pub fn deep_merge(destination: &mut Document, source: &Document) {
    for (key, value) in source {
        match destination.get_mut(key) {
            Some(existing) => merge_value(existing, value),
            None => {
                destination.insert(key.clone(), value.clone());
            }
        }
    }
}

fn merge_value(destination: &mut Bson, source: &Bson) {
    match (destination, source) {
        (Bson::Document(destination), Bson::Document(source)) => deep_merge(destination, source),
        (Bson::Array(destination), Bson::Array(source)) => {
            for (position, item) in source.iter().enumerate() {
                match destination.get_mut(position) {
                    Some(existing) => merge_value(existing, item),
                    None => destination.push(item.clone()),
                }
            }
        }
        (destination, source) => *destination = source.clone(),
    }
}

/// Type-erased view of a [`Model`] used by untyped collections.
pub trait ModelSchema: Send + Sync + Debug {
    /// Registered model name.
    fn name(&self) -> &str;

    /// Checks that `document` fits the model.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::TypeMismatch`] if it does not.
    fn validate(&self, document: &Document) -> DocumentStoreResult<()>;

    /// Merges `document` onto the model's default instance.
    fn project(&self, document: Document) -> DocumentStoreResult<Document>;
}

/// [`ModelSchema`] implementation for a concrete [`Model`].
pub struct ModelType<M: Model> {
    _marker: PhantomData<fn() -> M>,
}

impl<M: Model> ModelType<M> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }

    fn template(&self) -> DocumentStoreResult<Document> {
        M::default().to_document()
    }
}

impl<M: Model> Default for ModelType<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Debug for ModelType<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ModelType")
            .field(&M::model_name())
            .finish()
    }
}

impl<M: Model> ModelSchema for ModelType<M> {
    fn name(&self) -> &str {
        M::model_name()
    }

    fn validate(&self, document: &Document) -> DocumentStoreResult<()> {
        let mut merged = self.template()?;
        deep_merge(&mut merged, document);

        M::from_document(merged)
            .map(|_| ())
            .map_err(|err| DocumentStoreError::TypeMismatch {
                model: M::model_name().to_string(),
                reason: err.to_string(),
            })
    }

    fn project(&self, document: Document) -> DocumentStoreResult<Document> {
        let mut merged = self.template()?;
        deep_merge(&mut merged, &document);

        Ok(merged)
    }
}

/// Models known to a store, addressed by name from collection options.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn ModelSchema>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `M` under [`Model::model_name`], replacing any previous entry.
    pub fn register<M: Model>(&mut self) {
        self.models.insert(
            M::model_name().to_string(),
            Arc::new(ModelType::<M>::new()),
        );
    }

    /// Looks up a model by name.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Configuration`] if no model has that name.
    pub fn resolve(&self, name: &str) -> DocumentStoreResult<Arc<dyn ModelSchema>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| DocumentStoreError::Configuration(format!("unknown model '{name}'")))
    }

    /// Returns `true` if a model is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }
}
