use std::ffi::c_int;

use rusqlite::ffi;

use crate::error::{EngineError, Result, UsageError};
use crate::raw::RawStatement;
use crate::statement::{CursorState, Statement};
use crate::types::Value;

/// Build an array of [`Value`]s for positional binding.
///
/// Each argument goes through `Value::from`, so any type with a `From` impl
/// (integers, floats, strings, byte slices, [`Null`](crate::Null), `Option`)
/// can be mixed freely:
/// ```rust
/// use scoped_sqlite::{Null, Value, params};
///
/// let values = params![1, "One", 2.5, Null];
/// assert_eq!(values[1], Value::Text("One".into()));
/// assert!(values[3].is_null());
/// ```
#[macro_export]
macro_rules! params {
    () => {{
        let params: [$crate::Value; 0] = [];
        params
    }};
    ($($value:expr),+ $(,)?) => {
        [$($crate::Value::from($value)),+]
    };
}

/// Bind one value at a 1-based position, returning the engine's result code.
/// `Err` holds a code raised before the engine was called.
pub(crate) fn bind_value(
    raw: &RawStatement,
    index: c_int,
    value: &Value,
) -> std::result::Result<c_int, c_int> {
    match value {
        Value::Null => Ok(raw.bind_null(index)),
        Value::Integer(v) => Ok(raw.bind_int64(index, *v)),
        Value::Real(v) => Ok(raw.bind_double(index, *v)),
        Value::Text(v) => raw.bind_text(index, v),
        Value::Blob(v) => raw.bind_blob(index, v),
    }
}

impl Statement {
    /// Number of positional parameters in the compiled statement.
    ///
    /// # Errors
    /// Returns `UsageError::ConnectionClosed` if the owning database was closed.
    pub fn parameter_count(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(usize::try_from(self.raw.parameter_count()).unwrap_or_default())
    }

    /// Bind `value` to the 1-based parameter `position`.
    ///
    /// A statement that has already been stepped is rewound first; existing
    /// bindings at other positions are kept.
    ///
    /// # Errors
    /// Returns `UsageError::ParameterOutOfRange` when `position` is outside
    /// `1..=parameter_count`, or the engine error if binding fails.
    pub fn bind(&mut self, position: usize, value: impl Into<Value>) -> Result<()> {
        self.rewind()?;
        self.bind_at(position, &value.into())
    }

    /// Replace all bindings: clear them, then bind `values` to positions
    /// `1..=values.len()` in order.
    ///
    /// # Errors
    /// Returns `UsageError::ParameterOutOfRange` if more values are supplied
    /// than the statement has parameters, or the engine error if binding fails.
    pub fn bind_all(&mut self, values: &[Value]) -> Result<()> {
        self.rewind()?;
        self.clear_bindings()?;
        for (offset, value) in values.iter().enumerate() {
            self.bind_at(offset + 1, value)?;
        }
        Ok(())
    }

    /// Reset every parameter to NULL.
    ///
    /// # Errors
    /// Returns `UsageError::ConnectionClosed` if the owning database was closed,
    /// or `UsageError::StatementFailed` if the statement needs a reset.
    pub fn clear_bindings(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.state() == CursorState::Error {
            return Err(UsageError::StatementFailed.into());
        }
        let rc = self.raw.clear_bindings();
        self.check(rc)
    }

    fn bind_at(&mut self, position: usize, value: &Value) -> Result<()> {
        let count = self.parameter_count()?;
        if position == 0 || position > count {
            return Err(UsageError::ParameterOutOfRange {
                index: position,
                count,
            }
            .into());
        }
        // position <= count, and count came from a c_int.
        let index = c_int::try_from(position).unwrap_or(c_int::MAX);
        self.bind_outcome(bind_value(&self.raw, index, value))
    }

    fn bind_outcome(&self, outcome: std::result::Result<c_int, c_int>) -> Result<()> {
        match outcome {
            Ok(ffi::SQLITE_OK) => Ok(()),
            Ok(rc) => Err(self.conn.error(rc)),
            // The connection's last message belongs to some earlier call.
            Err(rc) => Err(EngineError::from_code(rc).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::error::Error;

    #[test]
    fn oversized_value_gets_static_message() {
        let db = Database::open_memory().expect("open");
        let stmt = db.prepare("SELECT ?").expect("prepare");
        // Leave an unrelated diagnostic on the connection.
        assert!(db.prepare("SELECT * FROM missing").is_err());

        let err = stmt
            .bind_outcome(Err(ffi::SQLITE_TOOBIG))
            .expect_err("too big");
        assert_eq!(err.engine_code(), Some(ffi::SQLITE_TOOBIG));
        assert!(!err.to_string().contains("missing"));
        assert!(matches!(err, Error::Engine(_)));
    }

    #[test]
    fn length_overflow_is_toobig() {
        assert_eq!(crate::raw::c_len(usize::MAX), Err(ffi::SQLITE_TOOBIG));
        assert_eq!(crate::raw::c_len(3), Ok(3));
    }
}
