//! Error types and result types for document store operations.
//!
//! Every fallible operation in this crate returns [`DocumentStoreResult<T>`].
//! Validation errors ([`DocumentStoreError::Configuration`],
//! [`DocumentStoreError::TypeMismatch`], [`DocumentStoreError::InvalidDocument`],
//! [`DocumentStoreError::InvalidQuery`]) are raised before any statement reaches the
//! backend. Backend failures are carried through untouched in
//! [`DocumentStoreError::Backend`]. A lookup that finds nothing is never an error.

use std::error::Error as StdError;

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Boxed error produced by a backend connector.
pub type BackendError = Box<dyn StdError + Send + Sync + 'static>;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Invalid collection options, an invalid collection name, or a model that
    /// cannot be resolved. Raised when a collection is constructed.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A write whose document does not fit the configured model type.
    #[error("Document does not match model {model}: {reason}")]
    TypeMismatch {
        /// Name of the configured model.
        model: String,
        /// Why the document was rejected.
        reason: String,
    },
    /// The document violates a structural rule of the write operation.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A filter query that cannot be translated.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// Serialization/deserialization error when converting between document formats
    /// (BSON, JSON) or decoding a result row.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A statement failed in the backend. The source error is kept as-is.
    #[error(transparent)]
    Backend(BackendError),
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DocumentStoreError {
    /// Wraps a backend error without altering it.
    pub fn backend<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        DocumentStoreError::Backend(Box::new(err))
    }

    /// Returns the backend's own error if this is a backend failure.
    pub fn backend_source(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            DocumentStoreError::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
