//! Production SQLite backend over sqlx's `Any` driver.
//!
//! Sessions are plain `AnyConnection`s driven to completion on a private
//! current-thread tokio runtime, which keeps the bridge synchronous for the
//! embedding host. Only the SQLite driver is compiled in; a URL naming any
//! other scheme fails to open.

use std::sync::Arc;

use futures::TryStreamExt;
use sqlx::{AnyConnection, Connection};
use tokio::runtime::Runtime;

use super::{Backend, Fetched, Session};
use crate::config::BridgeConfig;
use crate::error::{SqlmuxError, SqlmuxResult};
use crate::marshal;
use crate::value::{ExecSummary, Value};

/// URL prefix passed through to sqlx untouched.
const SCHEME: &str = "sqlite:";

/// Opens sqlx connections for resource names and URLs.
pub struct SqlxBackend {
    runtime: Arc<Runtime>,
    create_if_missing: bool,
}

impl SqlxBackend {
    /// Create a backend and its runtime.
    pub fn new(config: &BridgeConfig) -> SqlmuxResult<Self> {
        sqlx::any::install_default_drivers();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            runtime: Arc::new(runtime),
            create_if_missing: config.create_if_missing,
        })
    }

    /// Map a resource name to a connection URL.
    ///
    /// Supported forms:
    /// - `sqlite://path`, `sqlite:path` or `sqlite::memory:`
    /// - a bare SQLite path, or `:memory:`
    ///
    /// Other `scheme://` URLs are passed through and rejected by sqlx.
    pub fn resolve(&self, name: &str) -> String {
        if name.contains("://") || name.starts_with(SCHEME) {
            return name.to_string();
        }
        if name == ":memory:" || !self.create_if_missing || name.contains('?') {
            return format!("sqlite:{}", name);
        }
        format!("sqlite:{}?mode=rwc", name)
    }
}

impl Backend for SqlxBackend {
    fn connect(&self, name: &str) -> SqlmuxResult<Box<dyn Session>> {
        let url = self.resolve(name);
        tracing::debug!(%name, %url, "connecting");

        let conn = self.runtime.block_on(AnyConnection::connect(&url))?;

        Ok(Box::new(SqlxSession {
            conn,
            runtime: Arc::clone(&self.runtime),
        }))
    }
}

struct SqlxSession {
    conn: AnyConnection,
    runtime: Arc<Runtime>,
}

impl SqlxSession {
    fn last_insert_rowid(&mut self) -> SqlmuxResult<i64> {
        let query = sqlx::query("SELECT last_insert_rowid()");
        let row = self.runtime.block_on(query.fetch_one(&mut self.conn))?;
        Ok(marshal::column_value(&row, 0)?.as_integer().unwrap_or(0))
    }
}

impl Session for SqlxSession {
    fn ping(&mut self) -> SqlmuxResult<()> {
        self.runtime.block_on(self.conn.ping())?;
        Ok(())
    }

    fn execute(&mut self, statement: &str, params: &[Value]) -> SqlmuxResult<ExecSummary> {
        let query = marshal::bind_params(sqlx::query(statement), params);
        let result = self.runtime.block_on(query.execute(&mut self.conn))?;

        // The Any adapter drops SQLite's rowid, so ask the connection.
        let last_insert_id = match result.last_insert_id() {
            Some(id) => id,
            None => self.last_insert_rowid()?,
        };

        Ok(ExecSummary {
            last_insert_id,
            rows_affected: result.rows_affected() as i64,
        })
    }

    fn fetch(
        &mut self,
        statement: &str,
        params: &[Value],
        limit: Option<usize>,
    ) -> SqlmuxResult<Fetched> {
        let conn = &mut self.conn;

        self.runtime.block_on(async move {
            let query = marshal::bind_params(sqlx::query(statement), params);
            let mut stream = query.fetch(conn);
            let mut fetched = Fetched::default();

            while limit.is_none_or(|max| fetched.rows.len() < max) {
                match stream.try_next().await {
                    Ok(Some(row)) => match marshal::row_to_map(&row) {
                        Ok(map) => fetched.rows.push(map),
                        Err(e) => {
                            fetched.error = Some(e.into());
                            break;
                        }
                    },
                    Ok(None) => break,
                    // Nothing scanned yet: the statement itself failed.
                    Err(e) if fetched.rows.is_empty() => return Err(SqlmuxError::from(e)),
                    Err(e) => {
                        fetched.error = Some(e.into());
                        break;
                    }
                }
            }

            Ok(fetched)
        })
    }

    fn scalar(&mut self, statement: &str, params: &[Value]) -> SqlmuxResult<Value> {
        let query = marshal::bind_params(sqlx::query(statement), params);
        let row = self.runtime.block_on(query.fetch_one(&mut self.conn))?;
        Ok(marshal::column_value(&row, 0)?)
    }

    fn close(self: Box<Self>) -> SqlmuxResult<()> {
        let SqlxSession { conn, runtime } = *self;
        runtime.block_on(conn.close())?;
        Ok(())
    }
}
