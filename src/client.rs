//! Typed convenience wrapper over [`Bridge::dispatch`].
//!
//! Every method here builds the same dynamic argument list an embedded
//! script would send, so the wrapper exercises exactly the caller-facing
//! contract.
//!
//! ```rust,ignore
//! let client = Client::new(&BridgeConfig::default())?;
//! let db = client.open(":memory:")?;
//! db.exec("CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)", &[])?;
//! db.exec("INSERT INTO t(v) VALUES(?)", &["hello".into()])?;
//! let rows = db.query("SELECT * FROM t", &[])?;
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::BridgeConfig;
use crate::dispatch::{Bridge, Operation, Outcome};
use crate::error::{SqlmuxError, SqlmuxResult};
use crate::registry::Handle;
use crate::value::{ExecSummary, Row, Value};

/// Shared handle to a bridge. Cloning is cheap; calls are serialized.
#[derive(Clone)]
pub struct Client {
    bridge: Arc<Mutex<Bridge>>,
}

impl Client {
    pub fn new(config: &BridgeConfig) -> SqlmuxResult<Self> {
        Ok(Self::from_bridge(Bridge::new(config)?))
    }

    pub fn from_bridge(bridge: Bridge) -> Self {
        Self {
            bridge: Arc::new(Mutex::new(bridge)),
        }
    }

    /// Open a database by name or URL.
    pub fn open(&self, name: &str) -> SqlmuxResult<Database> {
        match self.call(Operation::Open, vec![Value::from(name)])? {
            Outcome::Handle(handle) => Ok(Database {
                client: self.clone(),
                handle,
            }),
            other => Err(unexpected(Operation::Open, &other)),
        }
    }

    /// Close every open database.
    pub fn shutdown(&self) {
        self.bridge
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shutdown();
    }

    fn call(&self, op: Operation, args: Vec<Value>) -> SqlmuxResult<Outcome> {
        self.bridge
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dispatch(op.name(), &args)
            .into_result()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

/// An open database handle.
pub struct Database {
    client: Client,
    handle: Handle,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl Database {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Run any statement.
    pub fn exec(&self, statement: &str, params: &[Value]) -> SqlmuxResult<ExecSummary> {
        match self.call(Operation::Exec, statement, params)? {
            Outcome::Exec(summary) => Ok(summary),
            other => Err(unexpected(Operation::Exec, &other)),
        }
    }

    /// All rows of a SELECT.
    pub fn query(&self, statement: &str, params: &[Value]) -> SqlmuxResult<Vec<Row>> {
        match self.call(Operation::Query, statement, params)? {
            Outcome::Rows(rows) => Ok(rows),
            other => Err(unexpected(Operation::Query, &other)),
        }
    }

    /// First row of a SELECT, empty when nothing matched.
    pub fn query_row(&self, statement: &str, params: &[Value]) -> SqlmuxResult<Row> {
        match self.call(Operation::QueryRow, statement, params)? {
            Outcome::Row(row) => Ok(row),
            other => Err(unexpected(Operation::QueryRow, &other)),
        }
    }

    /// Single value of a SELECT, e.g. `SELECT COUNT(*) ...`.
    pub fn query_result(&self, statement: &str, params: &[Value]) -> SqlmuxResult<Value> {
        match self.call(Operation::QueryResult, statement, params)? {
            Outcome::Scalar(value) => Ok(value),
            other => Err(unexpected(Operation::QueryResult, &other)),
        }
    }

    pub fn close(self) -> SqlmuxResult<()> {
        self.client
            .call(Operation::Close, vec![Value::from(self.handle)])
            .map(drop)
    }

    fn call(&self, op: Operation, statement: &str, params: &[Value]) -> SqlmuxResult<Outcome> {
        let mut args = Vec::with_capacity(params.len() + 2);
        args.push(Value::from(self.handle));
        args.push(Value::from(statement));
        args.extend_from_slice(params);
        self.client.call(op, args)
    }
}

fn unexpected(op: Operation, outcome: &Outcome) -> SqlmuxError {
    SqlmuxError::InternalFault {
        op: op.name().to_string(),
        message: format!("unexpected result {:?}", outcome),
    }
}
