use std::ffi::CString;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::config::{DatabaseOptions, DatabaseOptionsBuilder};
use crate::error::{Result, UsageError};
use crate::raw::RawConnection;
use crate::row::Row;
use crate::statement::Statement;

/// An open (or not yet opened) SQLite connection.
///
/// The connection is closed by [`close`](Self::close) or on drop. Statements
/// prepared from it share the underlying handle; closing the database while
/// they are alive is allowed, after which they report
/// [`UsageError::ConnectionClosed`].
///
/// No internal locking is done. `Database` is neither `Send` nor `Sync`; open
/// one connection per thread.
#[derive(Default)]
pub struct Database {
    conn: Option<Rc<RawConnection>>,
    path: Option<String>,
}

impl Database {
    /// A handle with no connection; open it with [`reopen`](Self::reopen).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (creating if needed) the database file at `path`.
    ///
    /// # Errors
    /// Returns `UsageError::InvalidPath` for a path that is not valid UTF-8 or
    /// contains NUL, or the engine error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(&DatabaseOptions::new(path_to_string(path.as_ref())?))
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns the engine error if the connection cannot be created.
    pub fn open_memory() -> Result<Self> {
        Self::open_with(&DatabaseOptions::memory())
    }

    /// Open a database with explicit options.
    ///
    /// # Errors
    /// Returns the engine error if the connection cannot be opened or the
    /// configured settings fail to apply.
    pub fn open_with(opts: &DatabaseOptions) -> Result<Self> {
        let mut db = Self::new();
        db.reopen_with(opts)?;
        Ok(db)
    }

    #[must_use]
    pub fn builder(path: impl Into<String>) -> DatabaseOptionsBuilder {
        DatabaseOptionsBuilder::new(path)
    }

    /// Open `path` on a handle that is currently closed.
    ///
    /// # Errors
    /// Returns `UsageError::AlreadyOpen` if the handle still holds a connection,
    /// otherwise as [`open`](Self::open).
    pub fn reopen(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let opts = DatabaseOptions::new(path_to_string(path.as_ref())?);
        self.reopen_with(&opts)
    }

    /// Open a connection with `opts` on a handle that is currently closed.
    ///
    /// # Errors
    /// Returns `UsageError::AlreadyOpen` if the handle still holds a connection,
    /// otherwise as [`open_with`](Self::open_with).
    pub fn reopen_with(&mut self, opts: &DatabaseOptions) -> Result<()> {
        if self.is_open() {
            return Err(UsageError::AlreadyOpen.into());
        }
        let conn = connect(opts)?;
        self.conn = Some(Rc::new(conn));
        self.path = Some(opts.path.clone());
        Ok(())
    }

    /// Close the connection.
    ///
    /// Statements prepared from this database stay valid Rust values but fail
    /// with `UsageError::ConnectionClosed` from now on; the engine releases the
    /// connection once the last of them is dropped.
    ///
    /// # Errors
    /// Returns `UsageError::ConnectionClosed` if the handle is not open, or the
    /// engine error if closing fails.
    pub fn close(&mut self) -> Result<()> {
        let conn = self.conn.take().ok_or(UsageError::ConnectionClosed)?;
        tracing::debug!(path = ?self.path, "closing database");
        conn.close()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.conn.as_ref().is_some_and(|conn| conn.is_open())
    }

    /// Path (or URI) the current connection was opened with.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.conn.as_ref().and(self.path.as_deref())
    }

    /// Run one or more semicolon-separated statements to completion,
    /// discarding any rows they produce.
    ///
    /// # Errors
    /// Returns the engine error (with the engine's message) of the first
    /// failing statement; earlier statements in the batch stay applied.
    pub fn exec(&self, sql: &str) -> Result<()> {
        self.raw()?.exec(sql)
    }

    /// Run a batch of statements and call `f` for every row any of them
    /// produces. Returning `false` from `f` stops the batch.
    ///
    /// Returns the number of rows passed to `f`.
    ///
    /// # Errors
    /// Returns the first prepare or step error; statements before it have run.
    pub fn query<F>(&self, sql: &str, mut f: F) -> Result<usize>
    where
        F: FnMut(&Row<'_>) -> bool,
    {
        let conn = self.raw()?;
        let mut rest = sql;
        let mut visited = 0;
        loop {
            let (raw, consumed) = conn.prepare(rest)?;
            rest = rest.get(consumed..).unwrap_or_default();
            // Only whitespace or comments left.
            let Some(raw) = raw else { break };

            let mut stmt = Statement::new(Rc::clone(conn), raw);
            let mut rows = stmt.cursor()?;
            while let Some(row) = rows.next()? {
                visited += 1;
                if !f(&row) {
                    return Ok(visited);
                }
            }
        }
        Ok(visited)
    }

    /// Compile exactly one SQL statement.
    ///
    /// # Errors
    /// Returns `UsageError::NoStatement` for empty or comment-only text,
    /// `UsageError::MultipleStatements` when anything but whitespace or
    /// comments follows the first statement, and the engine error for invalid
    /// SQL.
    pub fn prepare(&self, sql: &str) -> Result<Statement> {
        let conn = self.raw()?;
        let (raw, consumed) = conn.prepare(sql).inspect_err(|err| {
            tracing::debug!(error = %err, "prepare failed");
        })?;
        let raw = raw.ok_or(UsageError::NoStatement)?;

        let rest = sql.get(consumed..).unwrap_or_default();
        if !rest.trim().is_empty() && !matches!(conn.prepare(rest), Ok((None, _))) {
            return Err(UsageError::MultipleStatements.into());
        }
        Ok(Statement::new(Rc::clone(conn), raw))
    }

    /// Rows changed by the most recent INSERT, UPDATE or DELETE.
    ///
    /// # Errors
    /// Returns `UsageError::ConnectionClosed` if the handle is not open.
    pub fn changes(&self) -> Result<u64> {
        self.raw()?.changes()
    }

    /// Rows changed since the connection was opened.
    ///
    /// # Errors
    /// Returns `UsageError::ConnectionClosed` if the handle is not open.
    pub fn total_changes(&self) -> Result<u64> {
        self.raw()?.total_changes()
    }

    /// Rowid of the most recent successful INSERT.
    ///
    /// # Errors
    /// Returns `UsageError::ConnectionClosed` if the handle is not open.
    pub fn last_insert_rowid(&self) -> Result<i64> {
        self.raw()?.last_insert_rowid()
    }

    fn raw(&self) -> Result<&Rc<RawConnection>> {
        match &self.conn {
            Some(conn) if conn.is_open() => Ok(conn),
            _ => Err(UsageError::ConnectionClosed.into()),
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take()
            && conn.is_open()
            && let Err(err) = conn.close()
        {
            tracing::warn!(error = %err, path = ?self.path, "failed to close database on drop");
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path())
            .field("open", &self.is_open())
            .finish()
    }
}

fn path_to_string(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_owned)
        .ok_or_else(|| UsageError::InvalidPath(path.display().to_string()).into())
}

fn connect(opts: &DatabaseOptions) -> Result<RawConnection> {
    let c_path =
        CString::new(opts.path.as_str()).map_err(|_| UsageError::InvalidPath(opts.path.clone()))?;
    let conn = RawConnection::open(&c_path, opts.flags())?;
    if opts.extended_result_codes {
        conn.extended_result_codes(true)?;
    }
    if let Some(millis) = opts.busy_timeout_ms {
        conn.busy_timeout(millis)?;
    }
    if let Some(pragmas) = opts.pragmas() {
        conn.exec(&pragmas)?;
    }
    tracing::debug!(path = %opts.path, mode = ?opts.mode, "opened database");
    Ok(conn)
}
