//! In-memory backend for unit tests.
//!
//! Resource names select behavior: `unreachable` fails to connect,
//! `unpingable` fails the liveness probe, `stubborn` fails to close.
//! Statements containing `PANIC` panic, `FAIL` fail, `empty` return no rows,
//! and `broken` fail after the first row.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Backend, Fetched, Session};
use crate::error::{SqlmuxError, SqlmuxResult};
use crate::value::{ExecSummary, Row, Value};

#[derive(Debug, Default)]
pub(crate) struct Calls {
    pub connects: AtomicUsize,
    pub statements: AtomicUsize,
    pub closes: AtomicUsize,
}

impl Calls {
    pub fn statements(&self) -> usize {
        self.statements.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockBackend {
    calls: Arc<Calls>,
    rows: Vec<Row>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_rows(vec![
            row(&[("id", Value::Number(1.0)), ("v", Value::from("hello"))]),
            row(&[("id", Value::Number(2.0)), ("v", Value::Null)]),
        ])
    }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            calls: Arc::new(Calls::default()),
            rows,
        }
    }

    pub fn calls(&self) -> Arc<Calls> {
        Arc::clone(&self.calls)
    }
}

pub(crate) fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

impl Backend for MockBackend {
    fn connect(&self, name: &str) -> SqlmuxResult<Box<dyn Session>> {
        self.calls.connects.fetch_add(1, Ordering::SeqCst);
        if name == "unreachable" {
            return Err(SqlmuxError::Driver("unable to open database file".into()));
        }
        Ok(Box::new(MockSession {
            name: name.to_string(),
            calls: Arc::clone(&self.calls),
            rows: self.rows.clone(),
        }))
    }
}

struct MockSession {
    name: String,
    calls: Arc<Calls>,
    rows: Vec<Row>,
}

impl MockSession {
    fn enter(&self, statement: &str) -> SqlmuxResult<()> {
        self.calls.statements.fetch_add(1, Ordering::SeqCst);
        if statement.contains("PANIC") {
            panic!("mock driver panic");
        }
        if statement.contains("FAIL") {
            return Err(SqlmuxError::Driver(format!(
                "near \"{}\": syntax error",
                statement
            )));
        }
        Ok(())
    }
}

impl Session for MockSession {
    fn ping(&mut self) -> SqlmuxResult<()> {
        if self.name == "unpingable" {
            return Err(SqlmuxError::Driver("connection refused".into()));
        }
        Ok(())
    }

    fn execute(&mut self, statement: &str, params: &[Value]) -> SqlmuxResult<ExecSummary> {
        self.enter(statement)?;
        Ok(ExecSummary {
            last_insert_id: self.rows.len() as i64,
            rows_affected: params.len() as i64,
        })
    }

    fn fetch(
        &mut self,
        statement: &str,
        _params: &[Value],
        limit: Option<usize>,
    ) -> SqlmuxResult<Fetched> {
        self.enter(statement)?;
        if statement.contains("empty") {
            return Ok(Fetched::default());
        }
        if statement.contains("broken") {
            return Ok(Fetched {
                rows: self.rows.iter().take(1).cloned().collect(),
                error: Some(SqlmuxError::Driver("scan failed on row 2".into())),
            });
        }
        let take = limit.unwrap_or(self.rows.len());
        Ok(Fetched {
            rows: self.rows.iter().take(take).cloned().collect(),
            error: None,
        })
    }

    fn scalar(&mut self, statement: &str, _params: &[Value]) -> SqlmuxResult<Value> {
        self.enter(statement)?;
        self.rows
            .first()
            .filter(|_| !statement.contains("empty"))
            .and_then(|r| r.values().next().cloned())
            .ok_or_else(|| SqlmuxError::Driver("no rows in result set".into()))
    }

    fn close(self: Box<Self>) -> SqlmuxResult<()> {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
        if self.name == "stubborn" {
            return Err(SqlmuxError::Driver("database is locked".into()));
        }
        Ok(())
    }
}
