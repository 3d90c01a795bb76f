//! # sqlmux — a dynamic-call bridge to SQL databases
//!
//! sqlmux lets an untyped caller (an embedded scripting runtime that only
//! speaks strings, numbers, booleans, null and bytes) drive a relational
//! database through six named operations.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use sqlmux::prelude::*;
//!
//! let mut bridge = Bridge::new(&BridgeConfig::default())?;
//!
//! let db = bridge.dispatch("open", &[":memory:".into()]);
//! // => Response { result: Handle(0), error: None }
//!
//! bridge.dispatch("exec", &[0.into(), "CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)".into()]);
//! bridge.dispatch("exec", &[0.into(), "INSERT INTO t(v) VALUES(?)".into(), "hello".into()]);
//!
//! let rows = bridge.dispatch("query", &[0.into(), "SELECT * FROM t".into()]);
//! // => [{"id": 1, "v": "hello"}]
//! ```
//!
//! ## Operations
//!
//! | Operation     | Arguments                          | Result                       |
//! |---------------|------------------------------------|------------------------------|
//! | `open`        | name                               | handle (`-1` on failure)     |
//! | `close`       | handle                             | nothing                      |
//! | `exec`        | handle, statement, params...       | `{lastInsertId, rowsAffected}` |
//! | `query`       | handle, statement, params...       | list of rows                 |
//! | `queryRow`    | handle, statement, params...       | one row, possibly empty      |
//! | `queryResult` | handle, statement, params...       | one value                    |

pub mod backend;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod marshal;
pub mod registry;
pub mod value;

pub mod prelude {
    pub use crate::client::{Client, Database};
    pub use crate::config::BridgeConfig;
    pub use crate::dispatch::{Bridge, Operation, Outcome, Response};
    pub use crate::error::*;
    pub use crate::registry::Handle;
    pub use crate::value::{ExecSummary, Row, Value};
}
