//! Core traits and types for document representation and serialization.
//!
//! Stored documents are schemaless [`bson::Document`] maps. The reserved metadata
//! properties ([`ID_FIELD`], [`REVISION_FIELD`], [`UPDATED_FIELD`], [`ORIGIN_FIELD`])
//! live inside the same map and are attached on every write.
//!
//! A [`Model`] is an optional statically declared target type. Collections bound to a
//! model validate writes against it and merge results into it.

use bson::{
    Bson, Document,
    de::deserialize_from_document,
    ser::serialize_to_document,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Stable document identifier.
pub const ID_FIELD: &str = "id";
/// Version stamp assigned on every write.
pub const REVISION_FIELD: &str = "revision";
/// Timestamp of the write that produced the revision.
pub const UPDATED_FIELD: &str = "updated";
/// Timestamp of the id's first write.
pub const ORIGIN_FIELD: &str = "origin";

/// Metadata properties that are attached by the store and never indexed.
pub const RESERVED_FIELDS: [&str; 4] = [ID_FIELD, REVISION_FIELD, UPDATED_FIELD, ORIGIN_FIELD];

/// Returns `true` if `property` is one of the reserved metadata properties.
pub fn is_reserved(property: &str) -> bool {
    RESERVED_FIELDS.contains(&property)
}

/// A statically declared target type for a collection's documents.
///
/// The `Default` instance is the merge destination: a write is valid when it can be
/// merged onto the serialized default and deserialized back into the model.
///
/// # Example
///
/// ```ignore
/// use sqldoc::document::Model;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// pub struct User {
///     #[serde(default)]
///     pub id: Option<String>,
///     pub name: String,
///     pub age: i64,
/// }
///
/// impl Model for User {
///     fn model_name() -> &'static str { "user" }
///     fn collection_name() -> &'static str { "users" }
/// }
/// ```
pub trait Model: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    /// Name under which the model is registered and referenced by collection options.
    fn model_name() -> &'static str;

    /// Collection used by [`crate::store::DocumentStore::typed_collection`].
    fn collection_name() -> &'static str;
}

/// Conversion helpers for [`Model`] values.
///
/// Automatically implemented for all models.
pub trait ModelExt: Model {
    /// Converts this value to a BSON document.
    fn to_document(&self) -> DocumentStoreResult<Document>;

    /// Creates a value from a BSON document.
    fn from_document(document: Document) -> DocumentStoreResult<Self>;

    /// Converts this value to JSON.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a value from JSON.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<M: Model> ModelExt for M {
    fn to_document(&self) -> DocumentStoreResult<Document> {
        Ok(serialize_to_document(self)?)
    }

    fn from_document(document: Document) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_document(document)?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// Metadata attached to every stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub id: String,
    pub revision: i64,
    pub updated: String,
    pub origin: String,
}

impl Metadata {
    /// Writes the metadata properties into `document`, replacing caller-supplied values.
    pub fn attach(&self, document: &mut Document) {
        document.insert(ID_FIELD, self.id.clone());
        document.insert(REVISION_FIELD, self.revision);
        document.insert(UPDATED_FIELD, self.updated.clone());
        document.insert(ORIGIN_FIELD, self.origin.clone());
    }

    /// Reads the metadata back from a stored document.
    pub fn from_document(document: &Document) -> DocumentStoreResult<Self> {
        Ok(Self {
            id: text_field(document, ID_FIELD)?,
            revision: match document.get(REVISION_FIELD) {
                Some(Bson::Int64(revision)) => *revision,
                Some(Bson::Int32(revision)) => i64::from(*revision),
                _ => return Err(missing(REVISION_FIELD)),
            },
            updated: text_field(document, UPDATED_FIELD)?,
            origin: text_field(document, ORIGIN_FIELD)?,
        })
    }
}

fn text_field(document: &Document, field: &str) -> DocumentStoreResult<String> {
    match document.get(field) {
        Some(Bson::String(value)) => Ok(value.clone()),
        _ => Err(missing(field)),
    }
}

fn missing(field: &str) -> DocumentStoreError {
    DocumentStoreError::Serialization(format!("document has no valid '{field}' metadata"))
}

/// Encodes a document to raw BSON bytes for storage.
pub fn encode(document: &Document) -> DocumentStoreResult<Vec<u8>> {
    let mut bytes = Vec::new();
    document.to_writer(&mut bytes)?;

    Ok(bytes)
}

/// Decodes a document previously produced by [`encode`].
pub fn decode(bytes: &[u8]) -> DocumentStoreResult<Document> {
    Ok(Document::from_reader(bytes)?)
}
