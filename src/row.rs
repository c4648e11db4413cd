use std::ffi::c_int;

use chrono::{DateTime, NaiveDateTime};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::statement::Statement;
use crate::types::{ColumnType, Value};

/// Accepted text layouts for timestamps, tried in order.
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// The row a cursor is currently positioned on.
///
/// A `Row` borrows the cursor that produced it, so it cannot outlive the step
/// that fetched it and cannot be copied. Column indexes are 0-based; every
/// accessor rejects an index at or past [`column_count`](Self::column_count).
///
/// Typed accessors are strict about storage classes: a NULL column yields
/// [`Error::NullColumn`] (read it as `Option<T>` through [`get`](Self::get)
/// instead), and a mismatched class yields [`Error::InvalidColumnType`].
pub struct Row<'stmt> {
    stmt: &'stmt Statement,
}

impl<'stmt> Row<'stmt> {
    pub(crate) fn new(stmt: &'stmt Statement) -> Self {
        Self { stmt }
    }

    /// # Errors
    /// Returns `UsageError::ConnectionClosed` if the owning database was closed.
    pub fn column_count(&self) -> Result<usize> {
        self.stmt.column_count()
    }

    /// # Errors
    /// Returns `UsageError::ColumnOutOfRange` for an index past the last column.
    pub fn name(&self, index: usize) -> Result<String> {
        self.stmt.column_name(index)
    }

    /// Storage class of the value in this row.
    ///
    /// # Errors
    /// Returns `UsageError::ColumnOutOfRange` for an index past the last column.
    pub fn column_type(&self, index: usize) -> Result<ColumnType> {
        let col = self.stmt.check_column(index)?;
        Ok(self.type_at(col))
    }

    /// Type the column was declared with in its table, if it maps to one.
    ///
    /// # Errors
    /// Returns `UsageError::ColumnOutOfRange` for an index past the last column.
    pub fn declared_type(&self, index: usize) -> Result<Option<String>> {
        let col = self.stmt.check_column(index)?;
        Ok(self.stmt.raw.column_decltype(col))
    }

    /// # Errors
    /// Returns `UsageError::ColumnOutOfRange` for an index past the last column.
    pub fn is_null(&self, index: usize) -> Result<bool> {
        Ok(self.column_type(index)? == ColumnType::Null)
    }

    /// # Errors
    /// See [`get`](Self::get); values outside the `i32` range are a conversion error.
    pub fn int(&self, index: usize) -> Result<i32> {
        self.get(index)
    }

    /// # Errors
    /// See [`get`](Self::get).
    pub fn int64(&self, index: usize) -> Result<i64> {
        self.get(index)
    }

    /// Floating point value; integer columns widen.
    ///
    /// # Errors
    /// See [`get`](Self::get).
    pub fn double(&self, index: usize) -> Result<f64> {
        self.get(index)
    }

    /// Text value, embedded NUL bytes preserved. An empty string is returned as
    /// `""`; only a NULL column is an error.
    ///
    /// # Errors
    /// See [`get`](Self::get); text that is not valid UTF-8 is a conversion error.
    pub fn text(&self, index: usize) -> Result<String> {
        self.get(index)
    }

    /// Blob value; text columns yield their UTF-8 bytes.
    ///
    /// # Errors
    /// See [`get`](Self::get).
    pub fn blob(&self, index: usize) -> Result<Vec<u8>> {
        self.get(index)
    }

    /// The column as a [`Value`], whatever its storage class.
    ///
    /// # Errors
    /// Returns `UsageError::ColumnOutOfRange` for an index past the last column,
    /// or a conversion error for text that is not valid UTF-8.
    pub fn value(&self, index: usize) -> Result<Value> {
        let col = self.stmt.check_column(index)?;
        let raw = &self.stmt.raw;
        Ok(match self.type_at(col) {
            ColumnType::Null => Value::Null,
            ColumnType::Integer => Value::Integer(raw.column_int64(col)),
            ColumnType::Float => Value::Real(raw.column_double(col)),
            ColumnType::Text => Value::Text(decode_text(index, raw.column_text(col))?),
            ColumnType::Blob => Value::Blob(raw.column_blob(col)),
        })
    }

    /// Every column of the row, in order.
    ///
    /// # Errors
    /// See [`value`](Self::value).
    pub fn values(&self) -> Result<Vec<Value>> {
        (0..self.column_count()?).map(|index| self.value(index)).collect()
    }

    /// Read the column through its [`FromColumn`] impl.
    ///
    /// # Errors
    /// Returns `UsageError::ColumnOutOfRange`, `Error::NullColumn`,
    /// `Error::InvalidColumnType` or `Error::Conversion` as described on [`Row`].
    pub fn get<T: FromColumn>(&self, index: usize) -> Result<T> {
        T::from_column(self, index)
    }

    /// Column in the source table this result column was taken from.
    ///
    /// # Errors
    /// Returns `UsageError::ColumnOutOfRange` for an index past the last column.
    #[cfg(feature = "column-metadata")]
    pub fn origin_name(&self, index: usize) -> Result<Option<String>> {
        let col = self.stmt.check_column(index)?;
        Ok(self.stmt.raw.column_origin_name(col))
    }

    /// # Errors
    /// Returns `UsageError::ColumnOutOfRange` for an index past the last column.
    #[cfg(feature = "column-metadata")]
    pub fn table_name(&self, index: usize) -> Result<Option<String>> {
        let col = self.stmt.check_column(index)?;
        Ok(self.stmt.raw.column_table_name(col))
    }

    /// # Errors
    /// Returns `UsageError::ColumnOutOfRange` for an index past the last column.
    #[cfg(feature = "column-metadata")]
    pub fn database_name(&self, index: usize) -> Result<Option<String>> {
        let col = self.stmt.check_column(index)?;
        Ok(self.stmt.raw.column_database_name(col))
    }

    fn type_at(&self, col: c_int) -> ColumnType {
        ColumnType::from_code(self.stmt.raw.column_type(col))
    }

    /// Validate the index and reject NULL, returning the C index and class.
    fn non_null(&self, index: usize) -> Result<(c_int, ColumnType)> {
        let col = self.stmt.check_column(index)?;
        match self.type_at(col) {
            ColumnType::Null => Err(Error::NullColumn { index }),
            ty => Ok((col, ty)),
        }
    }
}

fn decode_text(index: usize, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Error::conversion(index, e))
}

fn mismatch(index: usize, expected: ColumnType, actual: ColumnType) -> Error {
    Error::InvalidColumnType {
        index,
        expected,
        actual,
    }
}

/// Types that can be read out of a [`Row`] column.
pub trait FromColumn: Sized {
    /// Read column `index` of `row`.
    ///
    /// # Errors
    /// Implementations report NULLs, storage-class mismatches and failed
    /// conversions.
    fn from_column(row: &Row<'_>, index: usize) -> Result<Self>;
}

impl FromColumn for i64 {
    fn from_column(row: &Row<'_>, index: usize) -> Result<Self> {
        match row.non_null(index)? {
            (col, ColumnType::Integer) => Ok(row.stmt.raw.column_int64(col)),
            (_, actual) => Err(mismatch(index, ColumnType::Integer, actual)),
        }
    }
}

macro_rules! from_column_narrow_int {
    ($($ty:ty),*) => {
        $(
            impl FromColumn for $ty {
                fn from_column(row: &Row<'_>, index: usize) -> Result<Self> {
                    let wide = i64::from_column(row, index)?;
                    <$ty>::try_from(wide).map_err(|e| Error::conversion(index, e))
                }
            }
        )*
    };
}

from_column_narrow_int!(i16, i32);

impl FromColumn for bool {
    fn from_column(row: &Row<'_>, index: usize) -> Result<Self> {
        Ok(i64::from_column(row, index)? != 0)
    }
}

impl FromColumn for f64 {
    fn from_column(row: &Row<'_>, index: usize) -> Result<Self> {
        match row.non_null(index)? {
            (col, ColumnType::Float | ColumnType::Integer) => Ok(row.stmt.raw.column_double(col)),
            (_, actual) => Err(mismatch(index, ColumnType::Float, actual)),
        }
    }
}

impl FromColumn for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_column(row: &Row<'_>, index: usize) -> Result<Self> {
        Ok(f64::from_column(row, index)? as f32)
    }
}

impl FromColumn for String {
    fn from_column(row: &Row<'_>, index: usize) -> Result<Self> {
        match row.non_null(index)? {
            (col, ColumnType::Text) => decode_text(index, row.stmt.raw.column_text(col)),
            (_, actual) => Err(mismatch(index, ColumnType::Text, actual)),
        }
    }
}

impl FromColumn for Vec<u8> {
    fn from_column(row: &Row<'_>, index: usize) -> Result<Self> {
        match row.non_null(index)? {
            (col, ColumnType::Blob | ColumnType::Text) => Ok(row.stmt.raw.column_blob(col)),
            (_, actual) => Err(mismatch(index, ColumnType::Blob, actual)),
        }
    }
}

impl FromColumn for Value {
    fn from_column(row: &Row<'_>, index: usize) -> Result<Self> {
        row.value(index)
    }
}

impl<T: FromColumn> FromColumn for Option<T> {
    fn from_column(row: &Row<'_>, index: usize) -> Result<Self> {
        if row.is_null(index)? {
            Ok(None)
        } else {
            T::from_column(row, index).map(Some)
        }
    }
}

/// Text timestamps in `YYYY-MM-DD HH:MM:SS[.fff]` (or ISO-8601 `T`) form, or
/// integer Unix seconds.
impl FromColumn for NaiveDateTime {
    fn from_column(row: &Row<'_>, index: usize) -> Result<Self> {
        match row.non_null(index)? {
            (col, ColumnType::Integer) => {
                let secs = row.stmt.raw.column_int64(col);
                DateTime::from_timestamp(secs, 0)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| Error::conversion(index, format!("timestamp {secs} out of range")))
            }
            (_, ColumnType::Text) => {
                let text = String::from_column(row, index)?;
                TIMESTAMP_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
                    .ok_or_else(|| Error::conversion(index, format!("invalid timestamp {text:?}")))
            }
            (_, actual) => Err(mismatch(index, ColumnType::Text, actual)),
        }
    }
}

/// JSON documents stored as text; numeric columns map to JSON numbers.
impl FromColumn for JsonValue {
    fn from_column(row: &Row<'_>, index: usize) -> Result<Self> {
        match row.non_null(index)? {
            (col, ColumnType::Integer) => Ok(JsonValue::from(row.stmt.raw.column_int64(col))),
            (col, ColumnType::Float) => Ok(JsonValue::from(row.stmt.raw.column_double(col))),
            (_, ColumnType::Text) => {
                let text = String::from_column(row, index)?;
                serde_json::from_str(&text).map_err(|e| Error::conversion(index, e))
            }
            (_, actual) => Err(mismatch(index, ColumnType::Text, actual)),
        }
    }
}
