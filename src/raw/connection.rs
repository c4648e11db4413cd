use std::cell::Cell;
use std::ffi::{CStr, CString, c_char, c_int};
use std::ptr::{self, NonNull};

use rusqlite::ffi;

use super::{EngineMessage, RawStatement, c_len, cstr_to_string, sqlite3_close_v2};
use crate::error::{EngineError, Error, Result, UsageError};

/// Owning wrapper around a `sqlite3*`.
///
/// The handle is closed with `sqlite3_close_v2`, so statements that are still
/// alive keep the engine-side connection as a zombie until they are finalized.
/// Once closed, `handle()` reports [`UsageError::ConnectionClosed`] for every
/// caller still holding a reference.
pub(crate) struct RawConnection {
    handle: Cell<*mut ffi::sqlite3>,
}

impl RawConnection {
    /// Open a connection with `sqlite3_open_v2`.
    pub(crate) fn open(path: &CStr, flags: c_int) -> Result<Self> {
        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let rc = unsafe { ffi::sqlite3_open_v2(path.as_ptr(), &raw mut db, flags, ptr::null()) };
        if rc == ffi::SQLITE_OK {
            return Ok(Self {
                handle: Cell::new(db),
            });
        }

        // The engine usually hands back a handle even when opening fails; it
        // carries the diagnostic and still has to be released.
        let err = if db.is_null() {
            EngineError::from_code(rc)
        } else {
            let message = unsafe { cstr_to_string(ffi::sqlite3_errmsg(db)) };
            unsafe { ffi::sqlite3_close(db) };
            match message {
                Some(message) => EngineError::with_message(rc, message),
                None => EngineError::from_code(rc),
            }
        };
        Err(err.into())
    }

    pub(crate) fn is_open(&self) -> bool {
        !self.handle.get().is_null()
    }

    /// Live connection pointer, or a usage error once the connection is closed.
    pub(crate) fn handle(&self) -> Result<*mut ffi::sqlite3> {
        let db = self.handle.get();
        if db.is_null() {
            Err(UsageError::ConnectionClosed.into())
        } else {
            Ok(db)
        }
    }

    /// Close the connection. Later calls through any clone of the owning `Rc`
    /// observe a closed handle.
    pub(crate) fn close(&self) -> Result<()> {
        let db = self.handle.replace(ptr::null_mut());
        if db.is_null() {
            return Err(UsageError::ConnectionClosed.into());
        }
        let rc = unsafe { sqlite3_close_v2(db) };
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(EngineError::from_code(rc).into())
        }
    }

    /// Translate a failing result code, attaching the connection's last message.
    pub(crate) fn error(&self, code: c_int) -> Error {
        let db = self.handle.get();
        if db.is_null() {
            return EngineError::from_code(code).into();
        }
        match unsafe { cstr_to_string(ffi::sqlite3_errmsg(db)) } {
            Some(message) => EngineError::with_message(code, message).into(),
            None => EngineError::from_code(code).into(),
        }
    }

    /// Run a batch of statements with `sqlite3_exec`, discarding any rows.
    pub(crate) fn exec(&self, sql: &str) -> Result<()> {
        let db = self.handle()?;
        let sql = CString::new(sql).map_err(|_| UsageError::NulInSql)?;
        let mut message = EngineMessage::new();
        let rc = unsafe {
            ffi::sqlite3_exec(db, sql.as_ptr(), None, ptr::null_mut(), message.as_out_ptr())
        };
        if rc == ffi::SQLITE_OK {
            return Ok(());
        }
        match message.text() {
            Some(text) => Err(EngineError::with_message(rc, text).into()),
            None => Err(self.error(rc)),
        }
    }

    /// Compile the first statement in `sql`.
    ///
    /// Returns the statement (or `None` when the text holds only whitespace or
    /// comments) together with the byte offset where the unparsed tail starts.
    pub(crate) fn prepare(&self, sql: &str) -> Result<(Option<RawStatement>, usize)> {
        let db = self.handle()?;
        // The engine stops parsing at a NUL, which would hide the rest of the text.
        if sql.contains('\0') {
            return Err(UsageError::NulInSql.into());
        }
        let len = c_len(sql.len()).map_err(|code| Error::from(EngineError::from_code(code)))?;
        let head = sql.as_ptr().cast::<c_char>();
        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
        let mut tail: *const c_char = ptr::null();
        let rc = unsafe { ffi::sqlite3_prepare_v2(db, head, len, &raw mut stmt, &raw mut tail) };
        if rc != ffi::SQLITE_OK {
            // prepare_v2 leaves *ppStmt NULL on failure.
            return Err(self.error(rc));
        }

        let consumed = if tail.is_null() {
            sql.len()
        } else {
            // SAFETY: the engine sets the tail inside the buffer we handed it.
            let offset = unsafe { tail.offset_from(head) };
            usize::try_from(offset).unwrap_or(sql.len()).min(sql.len())
        };
        Ok((NonNull::new(stmt).map(RawStatement::new), consumed))
    }

    pub(crate) fn changes(&self) -> Result<u64> {
        let db = self.handle()?;
        let n = unsafe { ffi::sqlite3_changes64(db) };
        Ok(u64::try_from(n).unwrap_or_default())
    }

    pub(crate) fn total_changes(&self) -> Result<u64> {
        let db = self.handle()?;
        let n = unsafe { ffi::sqlite3_total_changes64(db) };
        Ok(u64::try_from(n).unwrap_or_default())
    }

    pub(crate) fn last_insert_rowid(&self) -> Result<i64> {
        let db = self.handle()?;
        Ok(unsafe { ffi::sqlite3_last_insert_rowid(db) })
    }

    pub(crate) fn busy_timeout(&self, millis: u32) -> Result<()> {
        let db = self.handle()?;
        let millis = c_int::try_from(millis).unwrap_or(c_int::MAX);
        let rc = unsafe { ffi::sqlite3_busy_timeout(db, millis) };
        self.check(rc)
    }

    pub(crate) fn extended_result_codes(&self, enabled: bool) -> Result<()> {
        let db = self.handle()?;
        let rc = unsafe { ffi::sqlite3_extended_result_codes(db, c_int::from(enabled)) };
        self.check(rc)
    }

    fn check(&self, rc: c_int) -> Result<()> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(self.error(rc))
        }
    }
}

impl Drop for RawConnection {
    fn drop(&mut self) {
        let db = self.handle.replace(ptr::null_mut());
        if !db.is_null() {
            let rc = unsafe { sqlite3_close_v2(db) };
            if rc != ffi::SQLITE_OK {
                tracing::warn!(code = rc, "sqlite3_close_v2 failed while dropping connection");
            }
        }
    }
}
