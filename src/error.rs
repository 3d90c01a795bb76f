//! Error types for sqlmux.

use thiserror::Error;

/// The main error type for bridge operations.
#[derive(Debug, Error)]
pub enum SqlmuxError {
    /// Wrong argument shape, type, or count from the caller.
    #[error("{op}: argument {position}: expected {expected}, got {found}")]
    InvalidArgument {
        op: String,
        position: usize,
        expected: &'static str,
        found: String,
    },

    /// Unknown, out-of-range, or closed handle.
    #[error("Invalid handle {0}")]
    InvalidHandle(i64),

    /// Non-SELECT text passed to a read-only operation.
    #[error("Query strings must start with SELECT")]
    StatementGuardViolation,

    /// Unrecognized operation name.
    #[error("Unknown operation {op} with signature [{}]", .signature.join(", "))]
    UnknownOperation {
        op: String,
        signature: Vec<&'static str>,
    },

    /// Backend failure, message passed through verbatim.
    #[error("{0}")]
    Driver(String),

    /// Recovered panic, wrapped with the operation that raised it.
    #[error("{op}: {message}")]
    InternalFault { op: String, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SqlmuxError {
    /// Create an argument error for position `position` of `op`.
    pub fn argument(
        op: impl Into<String>,
        position: usize,
        expected: &'static str,
        found: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            op: op.into(),
            position,
            expected,
            found: found.into(),
        }
    }

    /// Stable name of the error kind, as reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "InvalidArgument",
            Self::InvalidHandle(_) => "InvalidHandle",
            Self::StatementGuardViolation => "StatementGuardViolation",
            Self::UnknownOperation { .. } => "UnknownOperation",
            Self::Driver(_) => "DriverError",
            Self::InternalFault { .. } => "InternalFault",
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
        }
    }
}

impl From<sqlx::Error> for SqlmuxError {
    fn from(e: sqlx::Error) -> Self {
        Self::Driver(e.to_string())
    }
}

/// Result type alias for bridge operations.
pub type SqlmuxResult<T> = Result<T, SqlmuxError>;
