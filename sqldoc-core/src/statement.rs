//! Statements and the named statement catalog.
//!
//! Each [`Template`] is a fixed SQL text with `{placeholder}` slots for identifiers and
//! generated fragments. Values are never substituted into the text; they are bound as
//! positional `?` parameters on the resulting [`Statement`].

use std::{fmt, str::FromStr};

use crate::{
    connector::SqlValue,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// SQL text with its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Creates a statement with no bound parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into(), params: Vec::new() }
    }

    /// Appends a parameter.
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Appends several parameters.
    pub fn bind_all(mut self, values: impl IntoIterator<Item = SqlValue>) -> Self {
        self.params.extend(values);
        self
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.sql, self.params)
    }
}

/// Quotes an SQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Physical tables backing one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    name: String,
    documents: String,
    index: String,
    lookup: String,
}

impl Tables {
    /// Derives table identifiers for a collection.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Configuration`] unless `name` starts with a letter
    /// or underscore and contains only ASCII letters, digits and underscores. Names that
    /// SQLite reserves (`sqlite_` prefix) or that end like a derived table (`_index`,
    /// `_index_lookup`) are rejected too, since they would collide with another
    /// collection's tables.
    pub fn for_collection(name: &str) -> DocumentStoreResult<Self> {
        let mut chars = name.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid {
            return Err(DocumentStoreError::Configuration(format!(
                "invalid collection name '{name}'"
            )));
        }

        let lower = name.to_ascii_lowercase();
        if lower.starts_with("sqlite_")
            || lower.ends_with("_index")
            || lower.ends_with("_index_lookup")
        {
            return Err(DocumentStoreError::Configuration(format!(
                "collection name '{name}' is reserved"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            documents: quote_identifier(name),
            index: quote_identifier(&format!("{name}_index")),
            lookup: quote_identifier(&format!("{name}_index_lookup")),
        })
    }

    /// The unquoted collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quoted primary table identifier.
    pub fn documents(&self) -> &str {
        &self.documents
    }

    /// Quoted index table identifier.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Substitutions shared by every template.
    pub(crate) fn substitutions(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("documents", self.documents.as_str()),
            ("index", self.index.as_str()),
            ("lookup", self.lookup.as_str()),
        ]
    }

    /// Renders `template` for these tables with no extra substitutions.
    pub fn statement(&self, template: Template) -> Statement {
        Statement::new(template.render(&self.substitutions()))
    }
}

/// The statement catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    CreateDocumentTable,
    CreateIndexTable,
    CreateIndexLookup,
    InsertRevision,
    DeleteDocument,
    DeleteExceptRevision,
    CommitRevision,
    InsertIndexEntry,
    DeleteIndexEntries,
    FetchCurrent,
    FetchOrigin,
    FetchRevisions,
    FilteredFetch,
    FilteredCount,
    Count,
    DropDocumentTable,
    DropIndexTable,
}

impl Template {
    pub const ALL: [Template; 17] = [
        Template::CreateDocumentTable,
        Template::CreateIndexTable,
        Template::CreateIndexLookup,
        Template::InsertRevision,
        Template::DeleteDocument,
        Template::DeleteExceptRevision,
        Template::CommitRevision,
        Template::InsertIndexEntry,
        Template::DeleteIndexEntries,
        Template::FetchCurrent,
        Template::FetchOrigin,
        Template::FetchRevisions,
        Template::FilteredFetch,
        Template::FilteredCount,
        Template::Count,
        Template::DropDocumentTable,
        Template::DropIndexTable,
    ];

    /// Catalog name of the template.
    pub fn name(&self) -> &'static str {
        match self {
            Template::CreateDocumentTable => "create_document_table",
            Template::CreateIndexTable => "create_index_table",
            Template::CreateIndexLookup => "create_index_lookup",
            Template::InsertRevision => "insert_revision",
            Template::DeleteDocument => "delete_document",
            Template::DeleteExceptRevision => "delete_except_revision",
            Template::CommitRevision => "commit_revision",
            Template::InsertIndexEntry => "insert_index_entry",
            Template::DeleteIndexEntries => "delete_index_entries",
            Template::FetchCurrent => "fetch_current",
            Template::FetchOrigin => "fetch_origin",
            Template::FetchRevisions => "fetch_revisions",
            Template::FilteredFetch => "filtered_fetch",
            Template::FilteredCount => "filtered_count",
            Template::Count => "count",
            Template::DropDocumentTable => "drop_document_table",
            Template::DropIndexTable => "drop_index_table",
        }
    }

    /// Raw template text.
    pub fn text(&self) -> &'static str {
        match self {
            Template::CreateDocumentTable => {
                "CREATE TABLE IF NOT EXISTS {documents} (\
                 id TEXT NOT NULL, \
                 revision INTEGER NOT NULL, \
                 committed INTEGER NOT NULL DEFAULT 0, \
                 updated TEXT NOT NULL, \
                 origin TEXT NOT NULL, \
                 document BLOB NOT NULL, \
                 PRIMARY KEY (id, revision))"
            }
            // `value` carries no declared type so integers, text and null keep their own
            // storage class and compare accordingly.
            Template::CreateIndexTable => {
                "CREATE TABLE IF NOT EXISTS {index} (\
                 id TEXT NOT NULL, \
                 type TEXT NOT NULL, \
                 property TEXT, \
                 value, \
                 origin TEXT NOT NULL)"
            }
            Template::CreateIndexLookup => {
                "CREATE INDEX IF NOT EXISTS {lookup} ON {index} (property, value, id)"
            }
            Template::InsertRevision => {
                "INSERT INTO {documents} (id, revision, committed, updated, origin, document) \
                 VALUES (?, ?, 0, ?, ?, ?)"
            }
            Template::DeleteDocument => "DELETE FROM {documents} WHERE id = ?",
            Template::DeleteExceptRevision => {
                "DELETE FROM {documents} WHERE id = ? AND revision <> ?"
            }
            Template::CommitRevision => {
                "UPDATE {documents} SET committed = 1 WHERE id = ? AND revision = ?"
            }
            Template::InsertIndexEntry => {
                "INSERT INTO {index} (id, type, property, value, origin) VALUES (?, ?, ?, ?, ?)"
            }
            Template::DeleteIndexEntries => "DELETE FROM {index} WHERE id = ?",
            Template::FetchCurrent => {
                "SELECT document FROM {documents} \
                 WHERE id = ? AND committed = 1 \
                 ORDER BY updated DESC, revision DESC LIMIT 1"
            }
            Template::FetchOrigin => {
                "SELECT origin, updated FROM {documents} \
                 WHERE id = ? ORDER BY updated DESC LIMIT 1"
            }
            Template::FetchRevisions => {
                "SELECT revision FROM {documents} WHERE id = ? ORDER BY updated DESC"
            }
            Template::FilteredFetch => {
                "SELECT DISTINCT base.id, {sort_key} AS sort_key FROM {index} AS base \
                 INNER JOIN {documents} AS doc ON doc.id = base.id AND doc.committed = 1 \
                 AND doc.updated = (SELECT MAX(latest.updated) FROM {documents} AS latest \
                 WHERE latest.id = base.id AND latest.committed = 1)\
                 {joins} WHERE base.type = ?{conditions} \
                 ORDER BY sort_key {direction}, base.id {direction}{limit}"
            }
            Template::FilteredCount => {
                "SELECT COUNT(DISTINCT base.id) FROM {index} AS base \
                 INNER JOIN {documents} AS doc ON doc.id = base.id AND doc.committed = 1 \
                 AND doc.updated = (SELECT MAX(latest.updated) FROM {documents} AS latest \
                 WHERE latest.id = base.id AND latest.committed = 1)\
                 {joins} WHERE base.type = ?{conditions}"
            }
            Template::Count => "SELECT COUNT(DISTINCT id) FROM {documents} WHERE committed = 1",
            Template::DropDocumentTable => "DROP TABLE IF EXISTS {documents}",
            Template::DropIndexTable => "DROP TABLE IF EXISTS {index}",
        }
    }

    /// Replaces every `{key}` slot named in `substitutions`.
    pub fn render(&self, substitutions: &[(&str, &str)]) -> String {
        substitutions
            .iter()
            .fold(self.text().to_string(), |sql, (key, value)| {
                sql.replace(&format!("{{{key}}}"), value)
            })
    }

    /// Looks a template up by name and renders it.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Configuration`] for an unknown name.
    pub fn get(name: &str, substitutions: &[(&str, &str)]) -> DocumentStoreResult<String> {
        Ok(name.parse::<Template>()?.render(substitutions))
    }
}

impl FromStr for Template {
    type Err = DocumentStoreError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Template::ALL
            .into_iter()
            .find(|template| template.name() == name)
            .ok_or_else(|| DocumentStoreError::Configuration(format!("unknown template '{name}'")))
    }
}
