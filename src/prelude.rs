//! Convenient imports for common functionality.
//!
//! ```rust
//! use scoped_sqlite::prelude::*;
//!
//! let db = Database::open_memory()?;
//! assert_eq!(db.prepare("SELECT 41 + ?")?.scalar_with::<i64>(&params![1])?, 42);
//! # Ok::<(), scoped_sqlite::Error>(())
//! ```

pub use crate::params;
pub use crate::{
    ColumnType, CursorState, Database, DatabaseOptions, EngineError, Error, FromColumn, Null,
    OpenMode, Result, Row, Rows, Statement, Transaction, UsageError, Value,
};
