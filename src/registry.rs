//! Connection registry.
//!
//! Slots are indexed by handle and never shift: closing a connection
//! tombstones its slot, so a handle is never handed to a second session.

use crate::backend::{Backend, Session};
use crate::error::{SqlmuxError, SqlmuxResult};

/// Caller-visible connection identifier.
pub type Handle = i64;

/// Ordered table of opened sessions.
pub struct Registry {
    backend: Box<dyn Backend + Send>,
    slots: Vec<Option<Box<dyn Session>>>,
}

impl Registry {
    pub fn new(backend: Box<dyn Backend + Send>) -> Self {
        Self {
            backend,
            slots: Vec::new(),
        }
    }

    /// Number of handles ever issued, open or closed.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `handle` names a live connection.
    pub fn is_open(&self, handle: Handle) -> bool {
        usize::try_from(handle)
            .ok()
            .and_then(|i| self.slots.get(i))
            .is_some_and(Option::is_some)
    }

    /// Open and probe a session; register it only if the probe succeeds.
    pub fn open(&mut self, name: &str) -> SqlmuxResult<Handle> {
        let wrap = |e: SqlmuxError| SqlmuxError::Driver(format!("open({}): {}", name, e));

        let mut session = self.backend.connect(name).map_err(wrap)?;
        if let Err(e) = session.ping() {
            if let Err(close_err) = session.close() {
                tracing::warn!(%name, error = %close_err, "close failed after failed ping");
            }
            return Err(wrap(e));
        }

        let handle = self.slots.len() as Handle;
        self.slots.push(Some(session));
        tracing::debug!(%name, handle, "opened connection");
        Ok(handle)
    }

    /// Borrow the live session behind `handle`.
    pub fn session(&mut self, handle: Handle) -> SqlmuxResult<&mut (dyn Session + 'static)> {
        self.slot(handle)?
            .as_deref_mut()
            .ok_or(SqlmuxError::InvalidHandle(handle))
    }

    /// Close `handle`. The slot is tombstoned even if the backend close fails.
    pub fn close(&mut self, handle: Handle) -> SqlmuxResult<()> {
        let session = self
            .slot(handle)?
            .take()
            .ok_or(SqlmuxError::InvalidHandle(handle))?;
        tracing::debug!(handle, "closing connection");
        session.close()
    }

    /// Close every live connection, ignoring individual failures.
    pub fn shutdown(&mut self) {
        for (handle, slot) in self.slots.iter_mut().enumerate() {
            if let Some(session) = slot.take() {
                if let Err(e) = session.close() {
                    tracing::warn!(handle, error = %e, "close failed during shutdown");
                }
            }
        }
    }

    fn slot(&mut self, handle: Handle) -> SqlmuxResult<&mut Option<Box<dyn Session>>> {
        usize::try_from(handle)
            .ok()
            .and_then(|i| self.slots.get_mut(i))
            .ok_or(SqlmuxError::InvalidHandle(handle))
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
