//! The single entry point for untyped callers.
//!
//! [`Bridge::dispatch`] takes an operation name and a list of dynamic
//! arguments, checks their shapes, runs the typed operation, and folds every
//! outcome into a [`Response`]. Panics raised below the dispatcher are caught
//! per call and reported as `InternalFault`, so one bad call never takes the
//! host down.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::backend::{Backend, SqlxBackend};
use crate::config::BridgeConfig;
use crate::error::{SqlmuxError, SqlmuxResult};
use crate::executor::{self, QueryFailure, QueryOutcome};
use crate::registry::{Handle, Registry};
use crate::value::{ExecSummary, Row, Value};

/// Operations understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Open,
    Close,
    Exec,
    Query,
    QueryRow,
    QueryResult,
}

impl Operation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "open" => Some(Self::Open),
            "close" => Some(Self::Close),
            "exec" => Some(Self::Exec),
            "query" => Some(Self::Query),
            "queryRow" => Some(Self::QueryRow),
            "queryResult" => Some(Self::QueryResult),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Exec => "exec",
            Self::Query => "query",
            Self::QueryRow => "queryRow",
            Self::QueryResult => "queryResult",
        }
    }
}

/// Successful (or partial) result of a dispatched call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    None,
    Handle(Handle),
    Exec(ExecSummary),
    Rows(Vec<Row>),
    Row(Row),
    Scalar(Value),
}

impl From<QueryOutcome> for Outcome {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::RowSet(rows) => Outcome::Rows(rows),
            QueryOutcome::SingleRow(row) => Outcome::Row(row),
        }
    }
}

/// The `(result, error)` pair returned to the caller.
///
/// `result` is meaningful alongside an error in two cases: a failed `open`
/// reports handle `-1`, and a `query` that failed mid-scan carries the rows
/// read before the failure.
#[derive(Debug)]
pub struct Response {
    pub result: Outcome,
    pub error: Option<SqlmuxError>,
}

impl Response {
    pub fn ok(result: Outcome) -> Self {
        Self {
            result,
            error: None,
        }
    }

    pub fn failure(result: Outcome, error: SqlmuxError) -> Self {
        Self {
            result,
            error: Some(error),
        }
    }

    pub fn from_result(result: SqlmuxResult<Outcome>) -> Self {
        match result {
            Ok(outcome) => Self::ok(outcome),
            Err(e) => Self::failure(Outcome::None, e),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Drop any partial result and keep the error, if there is one.
    pub fn into_result(self) -> SqlmuxResult<Outcome> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.result),
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct ErrorReport<'a> {
            kind: &'a str,
            message: String,
        }

        let error = self.error.as_ref().map(|e| ErrorReport {
            kind: e.kind(),
            message: e.to_string(),
        });

        let mut s = serializer.serialize_struct("Response", 2)?;
        s.serialize_field("result", &self.result)?;
        s.serialize_field("error", &error)?;
        s.end()
    }
}

/// Positional view over one call's arguments.
struct Args<'a> {
    op: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn mismatch(&self, position: usize, expected: &'static str) -> SqlmuxError {
        let found = self.values.get(position).map_or("missing", Value::type_name);
        SqlmuxError::argument(self.op, position, expected, found)
    }

    /// Reject anything past the first `count` arguments.
    fn at_most(&self, count: usize) -> SqlmuxResult<()> {
        if self.values.len() > count {
            return Err(self.mismatch(count, "no argument"));
        }
        Ok(())
    }

    fn string(&self, position: usize) -> SqlmuxResult<&'a str> {
        match self.values.get(position) {
            Some(Value::String(s)) => Ok(s),
            _ => Err(self.mismatch(position, "string")),
        }
    }

    /// A number, truncated toward zero.
    fn handle(&self, position: usize) -> SqlmuxResult<Handle> {
        self.values
            .get(position)
            .and_then(Value::as_integer)
            .ok_or_else(|| self.mismatch(position, "number"))
    }

    /// `handle, statement, params...`
    fn statement(&self) -> SqlmuxResult<(Handle, &'a str, &'a [Value])> {
        let handle = self.handle(0)?;
        let statement = self.string(1)?;
        let params = self.values.get(2..).unwrap_or_default();
        Ok((handle, statement, params))
    }
}

/// Owns the connection registry and routes dynamic calls into it.
pub struct Bridge {
    registry: Registry,
}

impl Bridge {
    /// Create a bridge backed by sqlx.
    pub fn new(config: &BridgeConfig) -> SqlmuxResult<Self> {
        Ok(Self::with_backend(SqlxBackend::new(config)?))
    }

    /// Create a bridge over any backend.
    pub fn with_backend(backend: impl Backend + Send + 'static) -> Self {
        Self {
            registry: Registry::new(Box::new(backend)),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Route `op` with `args`, never letting a panic escape.
    ///
    /// A recovered panic still runs the process panic hook first, and the
    /// default hook prints to stderr. Hosts that must keep stderr clean
    /// install their own hook with [`std::panic::set_hook`].
    pub fn dispatch(&mut self, op: &str, args: &[Value]) -> Response {
        match panic::catch_unwind(AssertUnwindSafe(|| self.route(op, args))) {
            Ok(response) => response,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::debug!(%op, %message, "recovered from panic");
                Response::failure(
                    Outcome::None,
                    SqlmuxError::InternalFault {
                        op: op.to_string(),
                        message,
                    },
                )
            }
        }
    }

    /// Close every open connection. Run once, after all other calls.
    pub fn shutdown(&mut self) {
        self.registry.shutdown();
    }

    fn route(&mut self, op: &str, values: &[Value]) -> Response {
        let Some(operation) = Operation::from_name(op) else {
            return Response::failure(
                Outcome::None,
                SqlmuxError::UnknownOperation {
                    op: op.to_string(),
                    signature: values.iter().map(Value::type_name).collect(),
                },
            );
        };
        let args = Args { op, values };
        let registry = &mut self.registry;

        match operation {
            Operation::Open => {
                let opened = args
                    .string(0)
                    .and_then(|name| args.at_most(1).map(|()| name))
                    .and_then(|name| registry.open(name));
                match opened {
                    Ok(handle) => Response::ok(Outcome::Handle(handle)),
                    Err(e) => Response::failure(Outcome::Handle(-1), e),
                }
            }
            Operation::Close => Response::from_result(
                args.handle(0)
                    .and_then(|handle| args.at_most(1).map(|()| handle))
                    .and_then(|handle| registry.close(handle))
                    .map(|()| Outcome::None),
            ),
            Operation::Exec => Response::from_result(
                args.statement()
                    .and_then(|(handle, statement, params)| {
                        executor::exec(registry, handle, statement, params)
                    })
                    .map(Outcome::Exec),
            ),
            Operation::Query | Operation::QueryRow => {
                let singleton = operation == Operation::QueryRow;
                let (handle, statement, params) = match args.statement() {
                    Ok(parts) => parts,
                    Err(e) => return Response::failure(Outcome::None, e),
                };
                match executor::query(registry, singleton, handle, statement, params) {
                    Ok(outcome) => Response::ok(outcome.into()),
                    Err(QueryFailure { partial, error }) => {
                        Response::failure(partial.map_or(Outcome::None, Outcome::from), error)
                    }
                }
            }
            Operation::QueryResult => Response::from_result(
                args.statement()
                    .and_then(|(handle, statement, params)| {
                        executor::query_result(registry, handle, statement, params)
                    })
                    .map(Outcome::Scalar),
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
