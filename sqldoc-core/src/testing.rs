//! In-process connector for unit tests.

use std::{fmt, io};

use parking_lot::Mutex;

use crate::{
    connector::{Connector, Cursor, Executor, Row},
    error::{DocumentStoreError, DocumentStoreResult},
    statement::Statement,
};

#[ctor::ctor]
fn init() {
    colog::init();
}

/// Records every statement and replays scripted rows for queries.
///
/// Transactions show up in the log as `BEGIN` followed by `COMMIT` or `ROLLBACK`.
#[derive(Default)]
pub(crate) struct RecordingConnector {
    log: Mutex<Vec<String>>,
    rows: Mutex<Vec<(String, Vec<Row>)>>,
    fail_on: Option<&'static str>,
}

impl fmt::Debug for RecordingConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RecordingConnector")
    }
}

impl RecordingConnector {
    /// Fails every statement whose SQL starts with `prefix`.
    pub(crate) fn failing_on(prefix: &'static str) -> Self {
        Self { fail_on: Some(prefix), ..Self::default() }
    }

    /// Queries whose SQL starts with `prefix` return `rows`.
    pub(crate) fn script(&self, prefix: &str, rows: Vec<Row>) {
        self.rows.lock().push((prefix.to_string(), rows));
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn record(&self, statement: &Statement) -> DocumentStoreResult<()> {
        self.log.lock().push(statement.sql.clone());
        match self.fail_on {
            Some(prefix) if statement.sql.starts_with(prefix) => {
                Err(DocumentStoreError::backend(io::Error::other("disk full")))
            }
            _ => Ok(()),
        }
    }
}

impl Executor for RecordingConnector {
    fn execute(&self, statement: &Statement) -> DocumentStoreResult<usize> {
        self.record(statement)?;
        Ok(1)
    }

    fn query(&self, statement: &Statement) -> DocumentStoreResult<Cursor> {
        self.record(statement)?;
        let rows = self
            .rows
            .lock()
            .iter()
            .find(|(prefix, _)| statement.sql.starts_with(prefix.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default();

        Ok(Cursor::new(rows))
    }
}

impl Connector for RecordingConnector {
    fn transaction(
        &self,
        work: &mut dyn FnMut(&dyn Executor) -> DocumentStoreResult<()>,
    ) -> DocumentStoreResult<()> {
        self.log.lock().push("BEGIN".into());
        let result = work(self);
        self.log
            .lock()
            .push(if result.is_ok() { "COMMIT" } else { "ROLLBACK" }.into());

        result
    }
}
