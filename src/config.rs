use std::ffi::c_int;

use rusqlite::ffi;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::{Error, Result};

/// In-memory database path understood by the engine.
pub const MEMORY_PATH: &str = ":memory:";

/// How the database file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Read-write, creating the file if it does not exist.
    #[default]
    ReadWriteCreate,
    /// Read-write; the file must already exist.
    ReadWrite,
    /// Read-only; the file must already exist.
    ReadOnly,
}

impl OpenMode {
    pub(crate) fn flags(self) -> c_int {
        match self {
            OpenMode::ReadWriteCreate => ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE,
            OpenMode::ReadWrite => ffi::SQLITE_OPEN_READWRITE,
            OpenMode::ReadOnly => ffi::SQLITE_OPEN_READONLY,
        }
    }
}

/// Journal mode applied right after the connection opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

/// Options for opening a [`Database`].
///
/// Deserializable, so connection settings can live in a JSON config file:
/// ```rust
/// use scoped_sqlite::{DatabaseOptions, JournalMode};
///
/// let opts = DatabaseOptions::from_json(r#"{ "path": "app.db", "journal_mode": "wal" }"#)?;
/// assert_eq!(opts.journal_mode, Some(JournalMode::Wal));
/// # Ok::<(), scoped_sqlite::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseOptions {
    pub path: String,
    #[serde(default)]
    pub mode: OpenMode,
    /// Interpret `path` as a `file:` URI.
    #[serde(default)]
    pub uri: bool,
    /// How long a statement waits on a locked database before failing with `SQLITE_BUSY`.
    #[serde(default)]
    pub busy_timeout_ms: Option<u32>,
    #[serde(default)]
    pub journal_mode: Option<JournalMode>,
    #[serde(default)]
    pub foreign_keys: Option<bool>,
    /// Report extended result codes (e.g. `SQLITE_CONSTRAINT_UNIQUE`).
    #[serde(default)]
    pub extended_result_codes: bool,
}

impl DatabaseOptions {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: OpenMode::default(),
            uri: false,
            busy_timeout_ms: None,
            journal_mode: None,
            foreign_keys: None,
            extended_result_codes: false,
        }
    }

    /// Options for a private in-memory database.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    /// Parse options from a JSON document.
    ///
    /// # Errors
    /// Returns `Error::Config` if the document does not describe valid options.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid database options: {e}")))
    }

    pub(crate) fn flags(&self) -> c_int {
        let mut flags = self.mode.flags();
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }
        flags
    }

    /// PRAGMA batch applied after opening, if any.
    pub(crate) fn pragmas(&self) -> Option<String> {
        let mut sql = String::new();
        if let Some(mode) = self.journal_mode {
            sql.push_str(&format!("PRAGMA journal_mode = {};", mode.as_sql()));
        }
        if let Some(enabled) = self.foreign_keys {
            let value = if enabled { "ON" } else { "OFF" };
            sql.push_str(&format!("PRAGMA foreign_keys = {value};"));
        }
        (!sql.is_empty()).then_some(sql)
    }
}

/// Fluent builder for [`DatabaseOptions`].
#[derive(Debug, Clone)]
pub struct DatabaseOptionsBuilder {
    opts: DatabaseOptions,
}

impl DatabaseOptionsBuilder {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            opts: DatabaseOptions::new(path),
        }
    }

    #[must_use]
    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.opts.mode = mode;
        self
    }

    #[must_use]
    pub fn uri(mut self, uri: bool) -> Self {
        self.opts.uri = uri;
        self
    }

    #[must_use]
    pub fn busy_timeout_ms(mut self, millis: u32) -> Self {
        self.opts.busy_timeout_ms = Some(millis);
        self
    }

    #[must_use]
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.opts.journal_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.opts.foreign_keys = Some(enabled);
        self
    }

    #[must_use]
    pub fn extended_result_codes(mut self, enabled: bool) -> Self {
        self.opts.extended_result_codes = enabled;
        self
    }

    #[must_use]
    pub fn finish(self) -> DatabaseOptions {
        self.opts
    }

    /// Open a [`Database`] with the collected options.
    ///
    /// # Errors
    ///
    /// Returns the engine error if the connection cannot be opened or the
    /// post-open settings fail to apply.
    pub fn open(self) -> Result<Database> {
        Database::open_with(&self.finish())
    }
}
