use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use log::trace;
use parking_lot::Mutex;
use rusqlite::{
    Connection, params_from_iter,
    types::{Value, ValueRef},
};
use sqldoc_core::{
    connector::{Connector, ConnectorBuilder, Cursor, Executor, Row, SqlValue},
    error::{DocumentStoreError, DocumentStoreResult},
    statement::Statement,
};

/// A [`Connector`] over a single SQLite connection.
///
/// Statements from all callers are serialized on the connection.
#[derive(Debug)]
pub struct SqliteConnector {
    connection: Mutex<Connection>,
}

impl SqliteConnector {
    /// Wraps an already opened connection.
    ///
    /// Use this to apply pragmas or extensions before handing the connection over.
    pub fn new(connection: Connection) -> Self {
        Self { connection: Mutex::new(connection) }
    }

    /// Creates a builder for configuring a new connection.
    pub fn builder() -> SqliteConnectorBuilder {
        SqliteConnectorBuilder::new()
    }

    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DocumentStoreResult<Self> {
        Self::builder().with_path(path).build()
    }

    /// Opens a private in-memory database, discarded when the connector is dropped.
    pub fn open_in_memory() -> DocumentStoreResult<Self> {
        Self::builder().build()
    }
}

impl Executor for SqliteConnector {
    fn execute(&self, statement: &Statement) -> DocumentStoreResult<usize> {
        ConnectionExecutor(&self.connection.lock()).execute(statement)
    }

    fn query(&self, statement: &Statement) -> DocumentStoreResult<Cursor> {
        ConnectionExecutor(&self.connection.lock()).query(statement)
    }
}

impl Connector for SqliteConnector {
    fn transaction(
        &self,
        work: &mut dyn FnMut(&dyn Executor) -> DocumentStoreResult<()>,
    ) -> DocumentStoreResult<()> {
        let mut connection = self.connection.lock();
        let transaction = connection
            .transaction()
            .map_err(DocumentStoreError::backend)?;

        // Dropping the transaction without committing rolls it back, also on unwind.
        work(&ConnectionExecutor(&transaction))?;

        transaction
            .commit()
            .map_err(DocumentStoreError::backend)
    }
}

/// Runs statements on an already locked connection or open transaction.
struct ConnectionExecutor<'a>(&'a Connection);

impl Executor for ConnectionExecutor<'_> {
    fn execute(&self, statement: &Statement) -> DocumentStoreResult<usize> {
        trace!("execute {statement}");

        self.0
            .prepare_cached(&statement.sql)
            .and_then(|mut prepared| prepared.execute(bind(statement)))
            .map_err(DocumentStoreError::backend)
    }

    fn query(&self, statement: &Statement) -> DocumentStoreResult<Cursor> {
        trace!("query {statement}");

        let mut prepared = self
            .0
            .prepare_cached(&statement.sql)
            .map_err(DocumentStoreError::backend)?;
        let columns = prepared.column_count();
        let mut rows = prepared
            .query(bind(statement))
            .map_err(DocumentStoreError::backend)?;

        let mut fetched = Vec::new();
        while let Some(row) = rows.next().map_err(DocumentStoreError::backend)? {
            let values = (0..columns)
                .map(|column| row.get_ref(column).map(from_sqlite))
                .collect::<Result<Vec<_>, _>>()
                .map_err(DocumentStoreError::backend)?;
            fetched.push(Row::new(values));
        }

        Ok(Cursor::new(fetched))
    }
}

fn bind(statement: &Statement) -> impl rusqlite::Params + '_ {
    params_from_iter(statement.params.iter().map(to_sqlite))
}

fn to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => Value::Integer(*value),
        SqlValue::Real(value) => Value::Real(*value),
        SqlValue::Text(value) => Value::Text(value.clone()),
        SqlValue::Blob(value) => Value::Blob(value.clone()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(value) => SqlValue::Integer(value),
        ValueRef::Real(value) => SqlValue::Real(value),
        ValueRef::Text(value) => SqlValue::Text(String::from_utf8_lossy(value).into_owned()),
        ValueRef::Blob(value) => SqlValue::Blob(value.to_vec()),
    }
}

/// Builder for [`SqliteConnector`]. Without a path the database lives in memory.
#[derive(Debug, Clone, Default)]
pub struct SqliteConnectorBuilder {
    path: Option<PathBuf>,
    busy_timeout: Option<Duration>,
}

impl SqliteConnectorBuilder {
    /// Creates a builder for an in-memory database without a busy timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the database in the file at `path`, creating it if needed.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// How long a statement waits on a locked database before failing.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }
}

impl ConnectorBuilder for SqliteConnectorBuilder {
    type Connector = SqliteConnector;

    fn build(self) -> DocumentStoreResult<Self::Connector> {
        let connection = match &self.path {
            Some(path) => Connection::open(path),
            None => Connection::open_in_memory(),
        }
        .map_err(DocumentStoreError::backend)?;

        if let Some(timeout) = self.busy_timeout {
            connection
                .busy_timeout(timeout)
                .map_err(DocumentStoreError::backend)?;
        }

        Ok(SqliteConnector::new(connection))
    }
}
