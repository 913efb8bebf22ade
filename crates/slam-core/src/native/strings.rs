//! String marshaling across the native boundary.
//!
//! Arguments are passed as temporary null-terminated UTF-8 buffers owned by
//! a `CString`, which releases them on every exit path when dropped.

use std::ffi::{CStr, CString, c_char};

use tracing::debug;

use crate::bytes::decode_utf8;

/// Encodes `value` as a null-terminated UTF-8 buffer.
///
/// Returns `None` when the value contains an interior null byte; such a name
/// cannot exist on the native side, so callers treat it as a miss.
pub fn to_native(value: &str) -> Option<CString> {
    match CString::new(value) {
        Ok(native) => Some(native),
        Err(e) => {
            debug!("Refusing to pass string with interior null: {}", e);
            None
        }
    }
}

/// Copies a native null-terminated UTF-8 string.
///
/// # Safety
///
/// `pointer` must be null or point at a null-terminated string that stays
/// valid for the duration of the call.
pub unsafe fn from_native(pointer: *const c_char) -> Option<String> {
    if pointer.is_null() {
        return None;
    }
    // SAFETY: non-null and null-terminated per the caller's contract.
    let bytes = unsafe { CStr::from_ptr(pointer) }.to_bytes();
    Some(decode_utf8(bytes))
}

/// Copies a string out of a fixed-size output buffer filled by native code.
pub fn from_buffer(buffer: &[u8]) -> String {
    decode_utf8(buffer)
}
