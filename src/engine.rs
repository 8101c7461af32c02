//! The patch engine: orchestrates allocation, redirect/body generation, and
//! the protected in-place rewrite of the target's prologue.

use crate::error::HookError;
use crate::platform;
use crate::trampoline::TrampolineRecord;
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

fn hooked_targets() -> &'static Mutex<HashSet<usize>> {
    static HOOKED: OnceLock<Mutex<HashSet<usize>>> = OnceLock::new();
    HOOKED.get_or_init(|| Mutex::new(HashSet::new()))
}

/// An installed hook. Dropping this handle without calling [`uninject`]
/// leaks the trampoline page and leaves the target patched forever — call
/// `uninject` explicitly when the hook should be removed.
pub struct HookHandle(pub(crate) Box<TrampolineRecord>);

impl HookHandle {
    /// Raw pointer to the trampoline body, callable with the target's
    /// original calling convention.
    pub fn trampoline_ptr(&self) -> *const () {
        self.0.body_ptr() as *const ()
    }

    /// Reinterpret the trampoline body as a function pointer of type `F`.
    ///
    /// # Safety
    /// `F` must be a `fn` or `extern "C" fn` pointer type matching the
    /// original target's exact calling convention and signature.
    pub unsafe fn as_fn<F: Copy>(&self) -> F {
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<usize>());
        let ptr = self.trampoline_ptr();
        unsafe { std::mem::transmute_copy(&ptr) }
    }
}

/// Rewrite `target`'s prologue so that calls to it are redirected to
/// `detour`, returning a handle to a trampoline that still behaves like the
/// original `target`.
///
/// # Safety
/// The caller must ensure no other thread is executing `target`'s current
/// bytes, the trampoline body of an overlapping hook, or patching another
/// target on an overlapping page, for the duration of this call.
pub unsafe fn inject(target: *const (), detour: *const ()) -> Result<HookHandle, HookError> {
    let target = target as *mut u8;
    let detour = detour as *mut u8;

    log::debug!("inject: target={:p} detour={:p}", target, detour);

    {
        let mut hooked = hooked_targets().lock().unwrap();
        if !hooked.insert(target as usize) {
            log::warn!("inject: {:p} is already hooked", target);
            return Err(HookError::AlreadyHooked);
        }
    }

    let record = match TrampolineRecord::build(target, detour) {
        Ok(record) => record,
        Err(e) => {
            hooked_targets().lock().unwrap().remove(&(target as usize));
            return Err(e);
        }
    };

    let redirect_len = record.redirect.len;
    let write = platform::with_writable(target, redirect_len, || unsafe {
        std::ptr::copy_nonoverlapping(record.redirect.bytes.as_ptr(), target, redirect_len);
    });
    if let Err(e) = write {
        hooked_targets().lock().unwrap().remove(&(target as usize));
        return Err(e);
    }

    platform::flush_icache(target, record.consumed);
    log::trace!(
        "inject: wrote redirect {:02x?} at {:p}",
        &record.redirect.bytes[..redirect_len],
        target
    );

    Ok(HookHandle(record))
}

/// Restore `target`'s original bytes and release the trampoline's
/// executable page. A no-op is modeled at the public API layer by simply
/// not calling this with an empty/null handle.
///
/// # Safety
/// Same quiescence requirement as [`inject`]. After this call, the
/// trampoline body must no longer be called by any thread.
pub unsafe fn uninject(handle: HookHandle) {
    let mut record = handle.0;
    let target = record.target;
    let redirect_len = record.redirect.len;

    let restore = platform::with_writable(target, redirect_len, || unsafe {
        std::ptr::copy_nonoverlapping(record.backup.as_ptr(), target, redirect_len);
    });
    restore.expect("failed to restore original bytes while uninjecting a hook");

    platform::flush_icache(target, record.consumed);
    hooked_targets().lock().unwrap().remove(&(target as usize));
    log::debug!("uninject: restored {:p}", target);

    // Safety: the target was just restored above, so no new call can enter
    // `body`; the caller's quiescence guarantee (see this function's safety
    // section) covers any thread still executing through a previously
    // captured trampoline pointer.
    unsafe { record.free_body_page() };
    drop(record);
}
