//! The trampoline record: the owner of a single hook's target/detour
//! addresses, redirect/backup bytes, and generated executable body.

use crate::arch::{self, BODY_CAPACITY, IsaBackend, Redirect};
use crate::error::HookError;
use crate::platform;

type Backend = arch::Backend;

/// One active hook. Built by [`TrampolineRecord::build`].
///
/// Deliberately has no `Drop` impl: the executable page backing `body` must
/// stay mapped for as long as any caller might hold a pointer into it
/// (`HookHandle::as_fn`/`trampoline_ptr`), and the target remains patched to
/// jump into it until [`crate::engine::uninject`] restores it. Only
/// `uninject`, which knows the target has been restored and no live
/// trampoline pointer is expected to be called anymore, may call
/// [`TrampolineRecord::free_body_page`]. An implicit drop of a `HookHandle`
/// that never went through `uninject` therefore just deallocates this
/// struct's own heap allocation and intentionally leaks the executable page,
/// matching [`crate::engine::HookHandle`]'s documented contract.
///
/// Contains only raw pointers with no interior mutability; moving or
/// sharing a reference across threads is sound because nothing here is
/// ever mutated after construction.
pub(crate) struct TrampolineRecord {
    pub target: *mut u8,
    pub detour: *mut u8,
    pub redirect: Redirect,
    pub backup: [u8; arch::MAX_REDIRECT_LEN],
    pub consumed: usize,
    body_page: *mut u8,
    body_page_len: usize,
}

unsafe impl Send for TrampolineRecord {}
unsafe impl Sync for TrampolineRecord {}

impl TrampolineRecord {
    pub fn build(target: *mut u8, detour: *mut u8) -> Result<Box<Self>, HookError> {
        let redirect = Backend::encode_redirect(target, detour);

        let mut backup = [0u8; arch::MAX_REDIRECT_LEN];
        unsafe {
            std::ptr::copy_nonoverlapping(target, backup.as_mut_ptr(), redirect.len);
        }

        let page_len = platform::page_size().max(BODY_CAPACITY);
        let body_page = platform::alloc_exec_page(page_len)?;

        // Safety: `alloc_exec_page` guarantees at least `page_len >= BODY_CAPACITY`
        // readable+writable+executable bytes at `body_page`.
        let body: &mut [u8; BODY_CAPACITY] = unsafe { &mut *(body_page as *mut [u8; BODY_CAPACITY]) };

        let consumed = match unsafe { Backend::relocate_prologue(target, body, redirect.len) } {
            Ok(c) => c,
            Err(e) => {
                unsafe { platform::free_exec_page(body_page, page_len) };
                return Err(e);
            }
        };

        log::trace!(
            "built trampoline for {:p}: {} bytes consumed, body at {:p}",
            target,
            consumed,
            body_page
        );

        Ok(Box::new(Self {
            target,
            detour,
            redirect,
            backup,
            consumed,
            body_page,
            body_page_len: page_len,
        }))
    }

    pub fn body_ptr(&self) -> *const u8 {
        self.body_page
    }

    /// Release the executable page backing `body`.
    ///
    /// # Safety
    /// The target must already be restored to its original bytes (so no new
    /// call can enter `body`), and the caller must guarantee no thread still
    /// holds or is executing through a pointer into `body`. Must be called
    /// at most once per record; only [`crate::engine::uninject`] calls this.
    pub(crate) unsafe fn free_body_page(&mut self) {
        unsafe { platform::free_exec_page(self.body_page, self.body_page_len) };
    }
}
