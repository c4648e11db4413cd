use std::ffi::{c_char, c_int, c_void};
use std::ptr::NonNull;
use std::slice;

use rusqlite::ffi;

use super::{c_len, cstr_to_string};

/// Owning wrapper around a `sqlite3_stmt*`, finalized on drop.
///
/// All methods are thin pass-throughs returning raw result codes; cursor state
/// and bounds checks live in [`crate::Statement`].
pub(crate) struct RawStatement {
    ptr: NonNull<ffi::sqlite3_stmt>,
}

impl RawStatement {
    pub(crate) fn new(ptr: NonNull<ffi::sqlite3_stmt>) -> Self {
        Self { ptr }
    }

    fn as_ptr(&self) -> *mut ffi::sqlite3_stmt {
        self.ptr.as_ptr()
    }

    pub(crate) fn step(&self) -> c_int {
        unsafe { ffi::sqlite3_step(self.as_ptr()) }
    }

    pub(crate) fn reset(&self) -> c_int {
        unsafe { ffi::sqlite3_reset(self.as_ptr()) }
    }

    pub(crate) fn clear_bindings(&self) -> c_int {
        unsafe { ffi::sqlite3_clear_bindings(self.as_ptr()) }
    }

    pub(crate) fn is_read_only(&self) -> bool {
        unsafe { ffi::sqlite3_stmt_readonly(self.as_ptr()) != 0 }
    }

    pub(crate) fn sql(&self) -> Option<String> {
        unsafe { cstr_to_string(ffi::sqlite3_sql(self.as_ptr())) }
    }

    pub(crate) fn parameter_count(&self) -> c_int {
        unsafe { ffi::sqlite3_bind_parameter_count(self.as_ptr()) }
    }

    pub(crate) fn bind_null(&self, index: c_int) -> c_int {
        unsafe { ffi::sqlite3_bind_null(self.as_ptr(), index) }
    }

    pub(crate) fn bind_int64(&self, index: c_int, value: i64) -> c_int {
        unsafe { ffi::sqlite3_bind_int64(self.as_ptr(), index, value) }
    }

    pub(crate) fn bind_double(&self, index: c_int, value: f64) -> c_int {
        unsafe { ffi::sqlite3_bind_double(self.as_ptr(), index, value) }
    }

    /// Bind UTF-8 text; the engine takes its own copy (`SQLITE_TRANSIENT`).
    /// `Err` carries a code produced without calling the engine.
    pub(crate) fn bind_text(&self, index: c_int, value: &str) -> Result<c_int, c_int> {
        let len = c_len(value.len())?;
        // A non-NULL pointer with length 0 binds an empty string, not NULL.
        Ok(unsafe {
            ffi::sqlite3_bind_text(
                self.as_ptr(),
                index,
                value.as_ptr().cast::<c_char>(),
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        })
    }

    /// Bind a blob; the engine takes its own copy (`SQLITE_TRANSIENT`).
    pub(crate) fn bind_blob(&self, index: c_int, value: &[u8]) -> Result<c_int, c_int> {
        let len = c_len(value.len())?;
        Ok(unsafe {
            ffi::sqlite3_bind_blob(
                self.as_ptr(),
                index,
                value.as_ptr().cast::<c_void>(),
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        })
    }

    pub(crate) fn column_count(&self) -> c_int {
        unsafe { ffi::sqlite3_column_count(self.as_ptr()) }
    }

    pub(crate) fn column_name(&self, index: c_int) -> Option<String> {
        unsafe { cstr_to_string(ffi::sqlite3_column_name(self.as_ptr(), index)) }
    }

    pub(crate) fn column_decltype(&self, index: c_int) -> Option<String> {
        unsafe { cstr_to_string(ffi::sqlite3_column_decltype(self.as_ptr(), index)) }
    }

    pub(crate) fn column_type(&self, index: c_int) -> c_int {
        unsafe { ffi::sqlite3_column_type(self.as_ptr(), index) }
    }

    pub(crate) fn column_int64(&self, index: c_int) -> i64 {
        unsafe { ffi::sqlite3_column_int64(self.as_ptr(), index) }
    }

    pub(crate) fn column_double(&self, index: c_int) -> f64 {
        unsafe { ffi::sqlite3_column_double(self.as_ptr(), index) }
    }

    /// UTF-8 bytes of the column, embedded NULs included.
    pub(crate) fn column_text(&self, index: c_int) -> Vec<u8> {
        // Length first: a later width-changing conversion would leave a stale pointer.
        let len = unsafe { ffi::sqlite3_column_bytes(self.as_ptr(), index) };
        let data = unsafe { ffi::sqlite3_column_text(self.as_ptr(), index) };
        unsafe { copy_column(data.cast::<u8>(), len) }
    }

    pub(crate) fn column_blob(&self, index: c_int) -> Vec<u8> {
        let len = unsafe { ffi::sqlite3_column_bytes(self.as_ptr(), index) };
        let data = unsafe { ffi::sqlite3_column_blob(self.as_ptr(), index) };
        unsafe { copy_column(data.cast::<u8>(), len) }
    }

    #[cfg(feature = "column-metadata")]
    pub(crate) fn column_origin_name(&self, index: c_int) -> Option<String> {
        unsafe { cstr_to_string(ffi::sqlite3_column_origin_name(self.as_ptr(), index)) }
    }

    #[cfg(feature = "column-metadata")]
    pub(crate) fn column_table_name(&self, index: c_int) -> Option<String> {
        unsafe { cstr_to_string(ffi::sqlite3_column_table_name(self.as_ptr(), index)) }
    }

    #[cfg(feature = "column-metadata")]
    pub(crate) fn column_database_name(&self, index: c_int) -> Option<String> {
        unsafe { cstr_to_string(ffi::sqlite3_column_database_name(self.as_ptr(), index)) }
    }
}

impl Drop for RawStatement {
    fn drop(&mut self) {
        // The return code repeats the last step error, which was already reported.
        unsafe { ffi::sqlite3_finalize(self.as_ptr()) };
    }
}

/// # Safety
/// `data` must be NULL or valid for `len` bytes.
unsafe fn copy_column(data: *const u8, len: c_int) -> Vec<u8> {
    let Ok(len) = usize::try_from(len) else {
        return Vec::new();
    };
    if data.is_null() || len == 0 {
        return Vec::new();
    }
    unsafe { slice::from_raw_parts(data, len) }.to_vec()
}
