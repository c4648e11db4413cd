use std::ffi::c_int;

use rusqlite::ffi;
use thiserror::Error;

pub use rusqlite::ffi::ErrorCode;

use crate::types::ColumnType;

/// A failure reported by the SQLite engine: its result code plus a
/// human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct EngineError {
    code: c_int,
    message: String,
}

impl EngineError {
    /// Build an error from a bare result code, taking the message from the
    /// engine's static code table.
    #[must_use]
    pub fn from_code(code: c_int) -> Self {
        Self {
            code,
            message: crate::raw::code_description(code),
        }
    }

    /// Build an error from a result code and an engine-supplied diagnostic.
    #[must_use]
    pub fn with_message(code: c_int, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The result code as reported, possibly an extended code.
    #[must_use]
    pub fn code(&self) -> c_int {
        self.code
    }

    /// The primary result code (low 8 bits of an extended code).
    #[must_use]
    pub fn primary_code(&self) -> c_int {
        self.code & 0xff
    }

    /// Classification of the result code.
    #[must_use]
    pub fn kind(&self) -> ErrorCode {
        ffi::Error::new(self.code).code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Contract violations by the caller. These never come from the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("database is already open; close it before opening another")]
    AlreadyOpen,

    #[error("database connection is closed")]
    ConnectionClosed,

    #[error("SQL text contains no statement")]
    NoStatement,

    #[error("SQL text contains more than one statement")]
    MultipleStatements,

    #[error("SQL text contains an interior NUL byte")]
    NulInSql,

    #[error("column index {index} out of range (column count {count})")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("parameter position {index} out of range (parameter count {count})")]
    ParameterOutOfRange { index: usize, count: usize },

    #[error("statement failed on its last step; call reset() before reusing it")]
    StatementFailed,

    #[error("invalid database path: {0}")]
    InvalidPath(String),
}

/// Every fallible operation in this crate returns this error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("column {index} is NULL")]
    NullColumn { index: usize },

    #[error("column {index} holds {actual:?}, expected {expected:?}")]
    InvalidColumnType {
        index: usize,
        expected: ColumnType,
        actual: ColumnType,
    },

    #[error("column {index} conversion error: {reason}")]
    Conversion { index: usize, reason: String },

    #[error("query returned no rows")]
    NoRows,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for caller contract violations.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }

    /// The engine result code, if the engine reported this error.
    #[must_use]
    pub fn engine_code(&self) -> Option<c_int> {
        match self {
            Error::Engine(err) => Some(err.code()),
            _ => None,
        }
    }

    pub(crate) fn conversion(index: usize, reason: impl ToString) -> Self {
        Error::Conversion {
            index,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
