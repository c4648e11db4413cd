use std::ffi::c_int;
use std::fmt;

use chrono::NaiveDateTime;
use rusqlite::ffi;
use serde_json::Value as JsonValue;

/// Explicit SQL `NULL` for binding, distinct from leaving a parameter unbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Null;

/// Storage class of a column value, as reported by the engine for the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Blob,
    Null,
}

impl ColumnType {
    pub(crate) fn from_code(code: c_int) -> Self {
        match code {
            ffi::SQLITE_INTEGER => ColumnType::Integer,
            ffi::SQLITE_FLOAT => ColumnType::Float,
            ffi::SQLITE_TEXT => ColumnType::Text,
            ffi::SQLITE_BLOB => ColumnType::Blob,
            _ => ColumnType::Null,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
            ColumnType::Null => "NULL",
        };
        f.write_str(name)
    }
}

/// Values that can be bound as statement parameters or read back from a row.
///
/// Binding a sequence of these assigns positions `1..=len` in order:
/// ```rust
/// use scoped_sqlite::Value;
///
/// let params = vec![
///     Value::Integer(1),
///     Value::Text("alice".into()),
///     Value::Null,
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Integer value (64-bit; narrower integers widen into it)
    Integer(i64),
    /// Floating point value (64-bit; `f32` widens into it)
    Real(f64),
    /// UTF-8 text, embedded NULs allowed
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Integer(_) => ColumnType::Integer,
            Value::Real(_) => ColumnType::Float,
            Value::Text(_) => ColumnType::Text,
            Value::Blob(_) => ColumnType::Blob,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let Value::Integer(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_real(&self) -> Option<f64> {
        if let Value::Real(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let Value::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

macro_rules! value_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Integer(i64::from(value))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Real(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Blob(value.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl From<Null> for Value {
    fn from(_: Null) -> Self {
        Value::Null
    }
}

/// Timestamps are stored as text in the `YYYY-MM-DD HH:MM:SS[.fff]` form.
impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Text(value.format("%F %T%.f").to_string())
    }
}

/// JSON is stored as its serialized text.
impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        Value::Text(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_numbers_widen() {
        assert_eq!(Value::from(i16::MIN), Value::Integer(-32768));
        assert_eq!(Value::from(u32::MAX), Value::Integer(4_294_967_295));
        assert_eq!(Value::from(1.5_f32), Value::Real(1.5));
        assert_eq!(Value::from(true), Value::Integer(1));
    }

    #[test]
    fn none_and_sentinel_are_null() {
        assert!(Value::from(None::<i32>).is_null());
        assert!(Value::from(Null).is_null());
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn timestamp_formats_as_text() {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 2, 29)
            .and_then(|d| d.and_hms_opt(13, 45, 0))
            .expect("valid timestamp");
        assert_eq!(Value::from(ts).as_text(), Some("2024-02-29 13:45:00"));
    }

    #[test]
    fn column_type_maps_engine_codes() {
        assert_eq!(ColumnType::from_code(ffi::SQLITE_INTEGER), ColumnType::Integer);
        assert_eq!(ColumnType::from_code(ffi::SQLITE_FLOAT), ColumnType::Float);
        assert_eq!(ColumnType::from_code(ffi::SQLITE_TEXT), ColumnType::Text);
        assert_eq!(ColumnType::from_code(ffi::SQLITE_BLOB), ColumnType::Blob);
        assert_eq!(ColumnType::from_code(ffi::SQLITE_NULL), ColumnType::Null);
        assert_eq!(Value::Real(0.5).column_type(), ColumnType::Float);
    }
}
