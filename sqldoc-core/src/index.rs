//! Entity-attribute-value index maintenance.
//!
//! Every committed write replaces the id's index rows with one `value` row per
//! indexable property plus exactly one `registry` row. A property is indexable when it
//! is not reserved metadata and holds a string, boolean, integer or null. Floats,
//! nested documents and arrays are never indexed.

use std::{fmt, str::FromStr};

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use crate::{
    connector::SqlValue,
    document::is_reserved,
    error::DocumentStoreError,
    statement::{Statement, Tables, Template},
};

/// Index row type. Also used by queries to select which rows the join pass starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// One row per indexable property.
    Value,
    /// One row per id, independent of properties.
    #[default]
    Registry,
}

impl IndexKind {
    /// Value stored in the index table's `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Value => "value",
            IndexKind::Registry => "registry",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = DocumentStoreError;

    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        match kind {
            "value" => Ok(IndexKind::Value),
            "registry" => Ok(IndexKind::Registry),
            other => Err(DocumentStoreError::InvalidQuery(format!("unknown index type '{other}'"))),
        }
    }
}

/// One row of a collection's index table.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Id of the indexed document.
    pub id: String,
    pub kind: IndexKind,
    /// Indexed property. `None` on registry rows.
    pub property: Option<String>,
    /// Property value as returned by [`IndexMaintainer::index_value`]. Null on registry rows.
    pub value: SqlValue,
    /// Origin of the document when the row was written.
    pub origin: String,
}

impl IndexEntry {
    fn insert_statement(&self, tables: &Tables) -> Statement {
        tables
            .statement(Template::InsertIndexEntry)
            .bind(self.id.as_str())
            .bind(self.kind.as_str())
            .bind(self.property.clone())
            .bind(self.value.clone())
            .bind(self.origin.as_str())
    }
}

/// Decides which properties are indexed and materializes their rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexMaintainer;

impl IndexMaintainer {
    /// Index representation of a value, or `None` if the value is not indexable.
    ///
    /// Booleans are stored as 1/0 so they share the integer storage class.
    pub fn index_value(value: &Bson) -> Option<SqlValue> {
        match value {
            Bson::String(value) => Some(SqlValue::Text(value.clone())),
            Bson::Boolean(value) => Some(SqlValue::from(*value)),
            Bson::Int32(value) => Some(SqlValue::from(*value)),
            Bson::Int64(value) => Some(SqlValue::Integer(*value)),
            Bson::Null => Some(SqlValue::Null),
            _ => None,
        }
    }

    /// Returns `true` if `property` gets a value row when it holds `value`.
    ///
    /// # Arguments
    ///
    /// * `property` - Property name; reserved metadata is never indexed
    /// * `value` - Property value; see [`index_value`](Self::index_value)
    pub fn is_indexable(property: &str, value: &Bson) -> bool {
        !is_reserved(property) && Self::index_value(value).is_some()
    }

    /// Index rows for `document`: value rows in property order, then the registry row.
    pub fn entries(id: &str, origin: &str, document: &Document) -> Vec<IndexEntry> {
        document
            .iter()
            .filter(|(property, value)| Self::is_indexable(property, value))
            .filter_map(|(property, value)| {
                Self::index_value(value).map(|value| IndexEntry {
                    id: id.to_string(),
                    kind: IndexKind::Value,
                    property: Some(property.clone()),
                    value,
                    origin: origin.to_string(),
                })
            })
            .chain(std::iter::once(IndexEntry {
                id: id.to_string(),
                kind: IndexKind::Registry,
                property: None,
                value: SqlValue::Null,
                origin: origin.to_string(),
            }))
            .collect()
    }

    /// Statements replacing all index rows of `id` with the rows for `document`.
    pub fn replace_statements(
        tables: &Tables,
        id: &str,
        origin: &str,
        document: &Document,
    ) -> Vec<Statement> {
        std::iter::once(Self::delete_statement(tables, id))
            .chain(
                Self::entries(id, origin, document)
                    .iter()
                    .map(|entry| entry.insert_statement(tables)),
            )
            .collect()
    }

    /// Statement removing all index rows of `id`.
    pub fn delete_statement(tables: &Tables, id: &str) -> Statement {
        tables.statement(Template::DeleteIndexEntries).bind(id)
    }
}
