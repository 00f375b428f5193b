//! Backend connector abstraction for the document store.
//!
//! A connector executes [`Statement`]s against a relational backend. The core never
//! interpolates literals into SQL text: every value travels as a bound [`SqlValue`].
//!
//! # Traits
//!
//! - [`Executor`]: runs single statements and returns affected rows or a [`Cursor`]
//! - [`Connector`]: a shareable executor that can also run a unit of work inside a
//!   backend transaction
//! - [`ConnectorBuilder`]: factory trait for creating connector instances
//!
//! # Examples
//!
//! ```ignore
//! use sqldoc::connector::{Executor, SqlValue};
//! use sqldoc::statement::Statement;
//!
//! let statement = Statement::new("SELECT id FROM users WHERE name = ?")
//!     .bind("ada");
//!
//! let mut cursor = connector.query(&statement)?;
//! while let Some(row) = cursor.fetch() {
//!     println!("{}", row.text(0)?);
//! }
//! ```

use std::fmt::Debug;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    statement::Statement,
};

/// A value bound to a statement parameter or read from a result column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        SqlValue::Text(value.clone())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Blob(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// One result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw value at `column`.
    pub fn get(&self, column: usize) -> Option<&SqlValue> {
        self.values.get(column)
    }

    /// Reads a text column.
    pub fn text(&self, column: usize) -> DocumentStoreResult<&str> {
        match self.get(column) {
            Some(SqlValue::Text(value)) => Ok(value),
            other => Err(unexpected(column, "text", other)),
        }
    }

    /// Reads an integer column.
    pub fn integer(&self, column: usize) -> DocumentStoreResult<i64> {
        match self.get(column) {
            Some(SqlValue::Integer(value)) => Ok(*value),
            other => Err(unexpected(column, "integer", other)),
        }
    }

    /// Reads a blob column.
    pub fn blob(&self, column: usize) -> DocumentStoreResult<&[u8]> {
        match self.get(column) {
            Some(SqlValue::Blob(value)) => Ok(value),
            other => Err(unexpected(column, "blob", other)),
        }
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

fn unexpected(column: usize, expected: &str, found: Option<&SqlValue>) -> DocumentStoreError {
    DocumentStoreError::Serialization(format!(
        "column {column}: expected {expected}, found {found:?}"
    ))
}

/// Rows produced by [`Executor::query`], fetched one at a time.
#[derive(Debug, Default)]
pub struct Cursor {
    rows: std::vec::IntoIter<Row>,
}

impl Cursor {
    /// Creates a cursor over already fetched rows.
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows: rows.into_iter() }
    }

    /// Fetches the next row, or `None` once the cursor is exhausted.
    pub fn fetch(&mut self) -> Option<Row> {
        self.rows.next()
    }
}

impl Iterator for Cursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.fetch()
    }
}

/// Runs single statements against a backend.
///
/// Statements run in the order they are issued. Failures must be reported as
/// [`DocumentStoreError::Backend`] carrying the backend's own error.
pub trait Executor {
    /// Executes a statement that returns no rows and reports the affected row count.
    fn execute(&self, statement: &Statement) -> DocumentStoreResult<usize>;

    /// Executes a statement and returns its rows.
    fn query(&self, statement: &Statement) -> DocumentStoreResult<Cursor>;
}

/// A shareable backend connection.
pub trait Connector: Executor + Send + Sync + Debug {
    /// Runs `work` against a transactional executor.
    ///
    /// Implementations commit when `work` returns `Ok` and roll back when it returns
    /// an error or unwinds. Backends without transactions may run `work` against the
    /// plain connection.
    fn transaction(
        &self,
        work: &mut dyn FnMut(&dyn Executor) -> DocumentStoreResult<()>,
    ) -> DocumentStoreResult<()>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, statement: &Statement) -> DocumentStoreResult<usize> {
        (**self).execute(statement)
    }

    fn query(&self, statement: &Statement) -> DocumentStoreResult<Cursor> {
        (**self).query(statement)
    }
}

impl<C: Connector + ?Sized> Connector for &C {
    fn transaction(
        &self,
        work: &mut dyn FnMut(&dyn Executor) -> DocumentStoreResult<()>,
    ) -> DocumentStoreResult<()> {
        (**self).transaction(work)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&self, statement: &Statement) -> DocumentStoreResult<usize> {
        (**self).execute(statement)
    }

    fn query(&self, statement: &Statement) -> DocumentStoreResult<Cursor> {
        (**self).query(statement)
    }
}

impl<C: Connector + ?Sized> Connector for Box<C> {
    fn transaction(
        &self,
        work: &mut dyn FnMut(&dyn Executor) -> DocumentStoreResult<()>,
    ) -> DocumentStoreResult<()> {
        (**self).transaction(work)
    }
}

/// Runs `work` in a transaction and hands back its output.
pub(crate) fn in_transaction<C, T, F>(connector: &C, mut work: F) -> DocumentStoreResult<T>
where
    C: Connector + ?Sized,
    F: FnMut(&dyn Executor) -> DocumentStoreResult<T>,
{
    let mut output = None;
    connector.transaction(&mut |executor: &dyn Executor| {
        output = Some(work(executor)?);
        Ok(())
    })?;

    output.ok_or_else(|| DocumentStoreError::Unknown("transaction finished without running".into()))
}

/// Factory for connector instances.
pub trait ConnectorBuilder {
    type Connector: Connector;

    fn build(self) -> DocumentStoreResult<Self::Connector>;
}
