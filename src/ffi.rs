//! Stable `extern "C"` surface mirroring the original `uhook.h` contract,
//! for non-Rust callers. Safe Rust code should prefer
//! [`crate::inject`]/[`crate::uninject`]/[`crate::dump`] instead.

use crate::engine::{self, HookHandle};
use std::os::raw::{c_char, c_int, c_uint, c_void};

/// Inject a hook. On success, `*out_handle` is set to a non-null opaque
/// token and `0` is returned. On failure, `*out_handle` is set to null and
/// a negative error code from the table in `HookError::as_ffi_code` is
/// returned.
///
/// # Safety
/// `out_handle` must be a valid, aligned, writable `*mut *mut c_void`.
/// `target` and `detour` must point to executable code with a matching
/// calling convention, and the caller must guarantee `target` is quiescent
/// for the duration of this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn inline_hook_inject(
    out_handle: *mut *mut c_void,
    target: *mut c_void,
    detour: *mut c_void,
) -> c_int {
    let result = unsafe { engine::inject(target as *const (), detour as *const ()) };
    match result {
        Ok(handle) => {
            let token = Box::into_raw(Box::new(handle)) as *mut c_void;
            unsafe { *out_handle = token };
            0
        }
        Err(e) => {
            unsafe { *out_handle = std::ptr::null_mut() };
            e.as_ffi_code()
        }
    }
}

/// Uninject a hook previously installed with [`inline_hook_inject`] and set
/// `*handle` to null. A null `*handle` (or a null `handle` itself) is a
/// no-op.
///
/// # Safety
/// `*handle`, if non-null, must be a token previously produced by
/// `inline_hook_inject` and not already uninjected. The caller must
/// guarantee the target is quiescent for the duration of this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn inline_hook_uninject(handle: *mut *mut c_void) {
    if handle.is_null() {
        return;
    }
    let token = unsafe { *handle };
    if token.is_null() {
        return;
    }
    let boxed = unsafe { Box::from_raw(token as *mut HookHandle) };
    unsafe { engine::uninject(*boxed) };
    unsafe { *handle = std::ptr::null_mut() };
}

/// Render diagnostic information about `handle` into `buffer`. Returns the
/// number of characters that would have been written, matching `snprintf`'s
/// return convention (the caller can detect truncation by comparing against
/// `size`).
///
/// # Safety
/// `handle` must be a live token produced by `inline_hook_inject`. `buffer`
/// must be valid for `size` writable bytes, or null (in which case nothing
/// is written but the length is still computed).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn inline_hook_dump(
    buffer: *mut c_char,
    size: c_uint,
    handle: *const c_void,
) -> c_int {
    if handle.is_null() {
        return 0;
    }
    let handle = unsafe { &*(handle as *const HookHandle) };
    let text = crate::dump::dump(handle);
    let bytes = text.as_bytes();

    if !buffer.is_null() && size > 0 {
        let capacity = size as usize - 1;
        let n = bytes.len().min(capacity);
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer as *mut u8, n);
            *buffer.add(n) = 0;
        }
    }

    bytes.len() as c_int
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninject_with_null_handle_pointer_is_a_noop() {
        unsafe { inline_hook_uninject(std::ptr::null_mut()) };
    }

    #[test]
    fn uninject_with_null_token_is_a_noop() {
        let mut token: *mut c_void = std::ptr::null_mut();
        unsafe { inline_hook_uninject(&mut token) };
        assert!(token.is_null());
    }

    #[test]
    fn dump_with_null_handle_returns_zero() {
        let n = unsafe { inline_hook_dump(std::ptr::null_mut(), 0, std::ptr::null()) };
        assert_eq!(n, 0);
    }
}
