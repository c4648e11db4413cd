//! RAII-scoped connections, prepared statements and lazy row cursors over the
//! SQLite C API.
//!
//! Open a database, prepare a statement once and run it with different
//! parameters, then walk the matching rows:
//!
//! ```rust
//! use scoped_sqlite::{Database, params};
//!
//! let db = Database::open_memory()?;
//! db.exec("CREATE TABLE test (id INTEGER, name TEXT);")?;
//!
//! let mut insert = db.prepare("INSERT INTO test (id, name) VALUES (?, ?)")?;
//! insert.execute_with(&params![1, "One"])?;
//! insert.execute_with(&params![2, "Two"])?;
//!
//! let mut select = db.prepare("SELECT id, name FROM test WHERE id BETWEEN ? AND ?")?;
//! let mut rows = select.cursor_with(&params![1, 2])?;
//! let mut names = Vec::new();
//! while let Some(row) = rows.next()? {
//!     names.push(row.text(1)?);
//! }
//! assert_eq!(names, ["One", "Two"]);
//! # Ok::<(), scoped_sqlite::Error>(())
//! ```
//!
//! Everything here is single-threaded and blocking: none of the handle types
//! are `Send` or `Sync`.

mod binding;
mod config;
mod database;
mod error;
mod raw;
mod row;
mod rows;
mod statement;
mod transaction;
mod types;

pub mod prelude;

pub use config::{DatabaseOptions, DatabaseOptionsBuilder, JournalMode, MEMORY_PATH, OpenMode};
pub use database::Database;
pub use error::{EngineError, Error, ErrorCode, Result, UsageError};
pub use row::{FromColumn, Row};
pub use rows::{MappedRows, Rows};
pub use statement::{CursorState, Statement};
pub use transaction::Transaction;
pub use types::{ColumnType, Null, Value};

/// Version of the linked SQLite library, e.g. `"3.46.0"`.
#[must_use]
pub fn sqlite_version() -> &'static str {
    rusqlite::version()
}
