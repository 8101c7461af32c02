//! Platform memory services: page size, W^X toggling, executable-page
//! allocation, and instruction-cache invalidation.
//!
//! The `unix` and `windows` submodules implement the same four operations
//! against `libc`/`mmap`/`mprotect` and `windows`/`VirtualAlloc`/`VirtualProtect`
//! respectively; everything above this module is written against the
//! platform-neutral functions re-exported here.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as imp;

#[cfg(windows)]
mod win;
#[cfg(windows)]
use win as imp;

use crate::error::HookError;
use std::sync::OnceLock;

static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

/// Size of a single page on this system, cached after the first query.
/// Falls back to 4096 if the OS reports a nonsensical value.
pub fn page_size() -> usize {
    *PAGE_SIZE.get_or_init(|| {
        let reported = imp::query_page_size();
        if reported == 0 { 4096 } else { reported }
    })
}

/// Round `addr` down to the start of the page that contains it.
pub fn page_floor(addr: usize) -> usize {
    addr & !(page_size() - 1)
}

/// Allocate at least `min_bytes` of RWX memory, page-aligned.
pub fn alloc_exec_page(min_bytes: usize) -> Result<*mut u8, HookError> {
    let len = min_bytes.max(page_size());
    imp::alloc_exec(len)
}

/// Free memory previously returned by [`alloc_exec_page`].
///
/// # Safety
/// `ptr` must have been returned by `alloc_exec_page` with the same `len`,
/// and must not be used again afterwards.
pub unsafe fn free_exec_page(ptr: *mut u8, len: usize) {
    unsafe { imp::free_exec(ptr, len) }
}

/// Invalidate the instruction cache for `[addr, addr + len)`.
pub fn flush_icache(addr: *const u8, len: usize) {
    imp::flush_icache(addr, len)
}

/// RAII guard that temporarily makes `[page_floor(addr), addr + len)` writable
/// and executable, restoring read+execute on drop.
///
/// Construction fails with [`HookError::ProtectionFailed`] if the initial
/// protection change is rejected by the OS. The restore on drop is treated as
/// an unrecoverable condition (it would leave code pages writable) and panics
/// rather than silently continuing, matching the `assert(ret == 0)` around
/// the equivalent restore step in the original C core.
pub struct WritableRegion {
    start: usize,
    len: usize,
}

impl WritableRegion {
    pub fn new(addr: *const u8, len: usize) -> Result<Self, HookError> {
        let start = page_floor(addr as usize);
        let span = (addr as usize + len) - start;
        imp::protect_rwx(start, span)?;
        Ok(Self { start, len: span })
    }
}

impl Drop for WritableRegion {
    fn drop(&mut self) {
        imp::protect_rx(self.start, self.len)
            .expect("failed to restore read+execute protection on a patched page");
    }
}

/// Run `f` with `[page_floor(addr), addr + len)` writable, then restore
/// read+execute protection before returning (or unwinding).
pub fn with_writable<R>(
    addr: *const u8,
    len: usize,
    f: impl FnOnce() -> R,
) -> Result<R, HookError> {
    let _guard = WritableRegion::new(addr, len)?;
    Ok(f())
}
