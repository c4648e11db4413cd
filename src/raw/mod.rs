// Raw SQLite handles - the only place this crate talks to the C API directly.
//
// This module is split into several sub-modules:
// - connection: owning wrapper for `sqlite3*`
// - statement: owning wrapper for `sqlite3_stmt*`
// - message: engine-allocated strings released with `sqlite3_free`
//
// Every `unsafe` block in the crate lives below this module.
#![allow(unsafe_code)]

pub(crate) mod connection;
pub(crate) mod message;
pub(crate) mod statement;

use std::ffi::{CStr, c_char, c_int};

use rusqlite::ffi;

pub(crate) use connection::RawConnection;
pub(crate) use message::EngineMessage;
pub(crate) use statement::RawStatement;

// libsqlite3-sys no longer generates a binding for this, but the bundled
// library still exports it.
unsafe extern "C" {
    pub(crate) fn sqlite3_close_v2(db: *mut ffi::sqlite3) -> c_int;
}

/// Look up the engine's static English description of a result code.
pub(crate) fn code_description(code: c_int) -> String {
    // sqlite3_errstr returns a pointer into a static table and never NULL.
    let ptr = unsafe { ffi::sqlite3_errstr(code) };
    unsafe { cstr_to_string(ptr) }.unwrap_or_else(|| "unknown error".to_string())
}

/// Copy a NUL-terminated UTF-8 string owned by the engine.
///
/// # Safety
/// `ptr` must be NULL or point at a NUL-terminated string that stays valid for
/// the duration of the call.
pub(crate) unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(ptr) };
    Some(text.to_string_lossy().into_owned())
}

/// Convert a Rust length to the `int` the C API expects, or `SQLITE_TOOBIG`.
pub(crate) fn c_len(len: usize) -> Result<c_int, c_int> {
    c_int::try_from(len).map_err(|_| ffi::SQLITE_TOOBIG)
}
