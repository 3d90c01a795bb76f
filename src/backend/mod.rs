//! Backend traits the registry and executor are written against.
//!
//! Sessions are synchronous: every call blocks until the backend answers.
//! The production backend lives in [`any`]; tests substitute a counting mock.

pub mod any;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::{SqlmuxError, SqlmuxResult};
use crate::value::{ExecSummary, Row, Value};

pub use any::SqlxBackend;

/// Rows produced by a fetch, plus the error that stopped the scan early.
#[derive(Debug, Default)]
pub struct Fetched {
    pub rows: Vec<Row>,
    pub error: Option<SqlmuxError>,
}

/// Opens sessions against named resources.
pub trait Backend {
    /// Open a session. Does not probe liveness; the registry pings afterwards.
    fn connect(&self, name: &str) -> SqlmuxResult<Box<dyn Session>>;
}

/// One opened database session.
pub trait Session: Send {
    /// Liveness probe.
    fn ping(&mut self) -> SqlmuxResult<()>;

    /// Run a statement with positional parameters.
    fn execute(&mut self, statement: &str, params: &[Value]) -> SqlmuxResult<ExecSummary>;

    /// Run a query and scan up to `limit` rows (all rows when `None`).
    ///
    /// `Err` means the statement failed before producing rows. A failure
    /// while scanning is reported in [`Fetched::error`] alongside the rows
    /// scanned so far.
    fn fetch(
        &mut self,
        statement: &str,
        params: &[Value],
        limit: Option<usize>,
    ) -> SqlmuxResult<Fetched>;

    /// First column of the first row. Zero rows is the driver's error.
    fn scalar(&mut self, statement: &str, params: &[Value]) -> SqlmuxResult<Value>;

    /// Release the session.
    fn close(self: Box<Self>) -> SqlmuxResult<()>;
}
