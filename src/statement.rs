use std::ffi::c_int;
use std::fmt;
use std::rc::Rc;

use rusqlite::ffi;

use crate::error::{EngineError, Error, Result, UsageError};
use crate::raw::{RawConnection, RawStatement};
use crate::row::FromColumn;
use crate::rows::Rows;
use crate::types::Value;

/// Position of a statement's cursor in the engine's step protocol.
///
/// ```text
/// Ready --step--> Row --step--> Row | Done
///   any --step (unexpected code)--> Error
/// ```
/// `Done` and `Error` are terminal until the statement is reset. Leaving
/// `Error` requires an explicit [`Statement::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorState {
    /// Not stepped since preparation or the last reset.
    Ready,
    /// Positioned on a row; column data is readable.
    Row,
    /// Exhausted.
    Done,
    /// The last step failed.
    Error,
}

/// A compiled SQL statement owned by this handle and finalized on drop.
///
/// The statement keeps its connection alive through a shared reference. If the
/// [`Database`](crate::Database) is closed first, every later call reports
/// [`UsageError::ConnectionClosed`].
///
/// Neither `Send` nor `Sync`: a statement must stay on the thread that
/// prepared it.
pub struct Statement {
    // Declared before `conn`: the statement must be finalized first.
    pub(crate) raw: RawStatement,
    pub(crate) conn: Rc<RawConnection>,
    state: CursorState,
}

impl Statement {
    pub(crate) fn new(conn: Rc<RawConnection>, raw: RawStatement) -> Self {
        Self {
            raw,
            conn,
            state: CursorState::Ready,
        }
    }

    #[must_use]
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// The SQL text the statement was compiled from.
    #[must_use]
    pub fn sql(&self) -> Option<String> {
        self.raw.sql()
    }

    /// True if the statement makes no direct changes to the database.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.raw.is_read_only()
    }

    /// Number of columns in the statement's result rows.
    ///
    /// # Errors
    /// Returns `UsageError::ConnectionClosed` if the owning database was closed.
    pub fn column_count(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(usize::try_from(self.raw.column_count()).unwrap_or_default())
    }

    /// Name of the result column at `index`.
    ///
    /// # Errors
    /// Returns `UsageError::ColumnOutOfRange` for an index past the last column.
    pub fn column_name(&self, index: usize) -> Result<String> {
        let col = self.check_column(index)?;
        // The engine only returns NULL here when it cannot allocate the name.
        self.raw
            .column_name(col)
            .ok_or_else(|| EngineError::from_code(ffi::SQLITE_NOMEM).into())
    }

    /// Names of all result columns, in order.
    ///
    /// # Errors
    /// Returns `UsageError::ConnectionClosed` if the owning database was closed.
    pub fn column_names(&self) -> Result<Vec<String>> {
        (0..self.column_count()?)
            .map(|index| self.column_name(index))
            .collect()
    }

    /// Run the statement to completion, ignoring any result rows, using the
    /// bindings currently in place.
    ///
    /// Returns the number of rows changed, or 0 for statements that change none
    /// (queries, DDL, PRAGMA).
    ///
    /// # Errors
    /// Returns the engine error if a step fails (the statement then needs
    /// [`reset`](Self::reset)), or `UsageError::StatementFailed` if it already
    /// was in that state.
    pub fn execute(&mut self) -> Result<u64> {
        self.rewind()?;
        // changes() keeps the last DML count across DDL and PRAGMA statements.
        let before = self.conn.total_changes()?;
        while self.step()? == CursorState::Row {}
        if self.raw.is_read_only() || self.conn.total_changes()? == before {
            Ok(0)
        } else {
            self.conn.changes()
        }
    }

    /// Replace the bindings with `params`, then [`execute`](Self::execute).
    ///
    /// # Errors
    /// Returns binding or execution errors.
    pub fn execute_with(&mut self, params: &[Value]) -> Result<u64> {
        self.bind_all(params)?;
        self.execute()
    }

    /// Start a fresh traversal of the result rows.
    ///
    /// Any unread rows from a previous traversal are discarded first. The
    /// returned [`Rows`] borrows the statement mutably, so only one cursor can
    /// be live per statement.
    ///
    /// # Errors
    /// Returns `UsageError::StatementFailed` if the last step failed and the
    /// statement has not been reset.
    pub fn cursor(&mut self) -> Result<Rows<'_>> {
        self.rewind()?;
        Ok(Rows::new(self))
    }

    /// Replace the bindings with `params`, then start a [`cursor`](Self::cursor).
    ///
    /// # Errors
    /// Returns binding errors or those of [`cursor`](Self::cursor).
    pub fn cursor_with(&mut self, params: &[Value]) -> Result<Rows<'_>> {
        self.bind_all(params)?;
        self.cursor()
    }

    /// First column of the first result row.
    ///
    /// # Errors
    /// Returns `Error::NoRows` when the query yields nothing, or conversion and
    /// engine errors.
    pub fn scalar<T: FromColumn>(&mut self) -> Result<T> {
        let mut rows = self.cursor()?;
        match rows.next()? {
            Some(row) => row.get(0),
            None => Err(Error::NoRows),
        }
    }

    /// Replace the bindings with `params`, then read a [`scalar`](Self::scalar).
    ///
    /// # Errors
    /// Returns binding errors or those of [`scalar`](Self::scalar).
    pub fn scalar_with<T: FromColumn>(&mut self, params: &[Value]) -> Result<T> {
        self.bind_all(params)?;
        self.scalar()
    }

    /// Rewind the cursor to `Ready`, clearing a failed state. Bindings are kept.
    ///
    /// # Errors
    /// Returns `UsageError::ConnectionClosed` if the owning database was closed,
    /// or an engine error if the reset itself fails.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        let failed = self.state == CursorState::Error;
        let rc = self.raw.reset();
        self.state = CursorState::Ready;
        // After a failed step the reset echoes that step's code; it was already reported.
        if failed || rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(self.conn.error(rc))
        }
    }

    /// Advance the cursor by one step.
    pub(crate) fn step(&mut self) -> Result<CursorState> {
        self.ensure_open()?;
        match self.state {
            CursorState::Error => return Err(UsageError::StatementFailed.into()),
            // The engine would silently restart a finished statement.
            CursorState::Done => return Ok(CursorState::Done),
            CursorState::Ready | CursorState::Row => {}
        }

        match self.raw.step() {
            ffi::SQLITE_ROW => self.state = CursorState::Row,
            ffi::SQLITE_DONE => {
                tracing::trace!("statement cursor exhausted");
                self.state = CursorState::Done;
            }
            code => {
                self.state = CursorState::Error;
                let err = self.conn.error(code);
                tracing::debug!(code, error = %err, "statement step failed");
                return Err(err);
            }
        }
        Ok(self.state)
    }

    /// Reset-before-use: bring a stepped statement back to `Ready`. A failed
    /// statement is left alone and reported.
    pub(crate) fn rewind(&mut self) -> Result<()> {
        self.ensure_open()?;
        match self.state {
            CursorState::Ready => Ok(()),
            CursorState::Error => Err(UsageError::StatementFailed.into()),
            CursorState::Row | CursorState::Done => {
                let rc = self.raw.reset();
                self.state = CursorState::Ready;
                self.check(rc)
            }
        }
    }

    /// Called when a cursor goes away: park the statement back at `Ready`.
    pub(crate) fn release_cursor(&mut self) {
        if !self.conn.is_open() {
            return;
        }
        if matches!(self.state, CursorState::Row | CursorState::Done) {
            let rc = self.raw.reset();
            if rc != ffi::SQLITE_OK {
                tracing::warn!(code = rc, "statement reset failed while releasing cursor");
            }
            self.state = CursorState::Ready;
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        self.conn.handle().map(|_| ())
    }

    pub(crate) fn check(&self, rc: c_int) -> Result<()> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(self.conn.error(rc))
        }
    }

    /// Validate a 0-based column index and convert it for the C API.
    pub(crate) fn check_column(&self, index: usize) -> Result<c_int> {
        let count = self.column_count()?;
        if index >= count {
            return Err(UsageError::ColumnOutOfRange { index, count }.into());
        }
        Ok(c_int::try_from(index).unwrap_or(c_int::MAX))
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.raw.sql())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
