use std::ffi::{c_char, c_void};
use std::ptr;

use rusqlite::ffi;

use super::cstr_to_string;

/// A diagnostic string allocated by the engine (e.g. by `sqlite3_exec`).
///
/// The buffer is released with `sqlite3_free` exactly once, when the guard is
/// dropped, whichever way the caller leaves the scope.
pub(crate) struct EngineMessage {
    ptr: *mut c_char,
}

impl EngineMessage {
    pub(crate) fn new() -> Self {
        Self {
            ptr: ptr::null_mut(),
        }
    }

    /// Out-pointer handed to the C call that may allocate the message.
    pub(crate) fn as_out_ptr(&mut self) -> *mut *mut c_char {
        &raw mut self.ptr
    }

    /// Copy of the message, if the engine produced one.
    pub(crate) fn text(&self) -> Option<String> {
        // SAFETY: the pointer is either NULL or an engine-owned C string we have
        // not freed yet.
        unsafe { cstr_to_string(self.ptr) }
    }
}

impl Drop for EngineMessage {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { ffi::sqlite3_free(self.ptr.cast::<c_void>()) };
            self.ptr = ptr::null_mut();
        }
    }
}
