//! Statement execution against registered connections.
//!
//! Read-only operations are protected by a textual guard: the statement must
//! begin with `select` (ASCII case-insensitive). This is a best-effort check
//! against accidental writes, not a parser; a SELECT can still reach
//! mutating functions.

use crate::error::{SqlmuxError, SqlmuxResult};
use crate::registry::{Handle, Registry};
use crate::value::{ExecSummary, Row, Value};

/// Shaped result of a row-returning query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Every matching row, in backend order.
    RowSet(Vec<Row>),
    /// The first matching row, or an empty row when nothing matched.
    SingleRow(Row),
}

/// A failed query, with whatever was scanned before the failure.
#[derive(Debug)]
pub struct QueryFailure {
    pub partial: Option<QueryOutcome>,
    pub error: SqlmuxError,
}

impl From<SqlmuxError> for QueryFailure {
    fn from(error: SqlmuxError) -> Self {
        Self {
            partial: None,
            error,
        }
    }
}

/// True when the first six characters of `statement` spell `select`.
pub fn is_select(statement: &str) -> bool {
    statement
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("select"))
}

fn guard(statement: &str) -> SqlmuxResult<()> {
    if is_select(statement) {
        Ok(())
    } else {
        Err(SqlmuxError::StatementGuardViolation)
    }
}

/// Execute a statement and report the insert id and affected row count.
pub fn exec(
    registry: &mut Registry,
    handle: Handle,
    statement: &str,
    params: &[Value],
) -> SqlmuxResult<ExecSummary> {
    registry.session(handle)?.execute(statement, params)
}

/// Run a SELECT and shape its rows.
///
/// With `singleton`, at most one row is scanned and zero matches yield an
/// empty row. Otherwise all rows are scanned; a scan failure returns the rows
/// collected so far in [`QueryFailure::partial`].
pub fn query(
    registry: &mut Registry,
    singleton: bool,
    handle: Handle,
    statement: &str,
    params: &[Value],
) -> Result<QueryOutcome, QueryFailure> {
    let session = registry.session(handle)?;
    guard(statement)?;

    if singleton {
        let fetched = session.fetch(statement, params, Some(1))?;
        if let Some(error) = fetched.error {
            return Err(error.into());
        }
        let row = fetched.rows.into_iter().next().unwrap_or_default();
        return Ok(QueryOutcome::SingleRow(row));
    }

    let fetched = session.fetch(statement, params, None)?;
    match fetched.error {
        Some(error) => Err(QueryFailure {
            partial: Some(QueryOutcome::RowSet(fetched.rows)),
            error,
        }),
        None => Ok(QueryOutcome::RowSet(fetched.rows)),
    }
}

/// Run a SELECT and return the first column of its first row.
pub fn query_result(
    registry: &mut Registry,
    handle: Handle,
    statement: &str,
    params: &[Value],
) -> SqlmuxResult<Value> {
    let session = registry.session(handle)?;
    guard(statement)?;
    session.scalar(statement, params)
}
