use crate::error::HookError;
use libc::{c_void, sysconf, _SC_PAGESIZE};

unsafe extern "C" {
    fn inline_hook_clear_cache(start: *mut c_void, end: *mut c_void);
}

pub(super) fn query_page_size() -> usize {
    let size = unsafe { sysconf(_SC_PAGESIZE) };
    if size <= 0 { 0 } else { size as usize }
}

pub(super) fn alloc_exec(len: usize) -> Result<*mut u8, HookError> {
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
            libc::MAP_ANONYMOUS | libc::MAP_PRIVATE,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        log::warn!("mmap failed while allocating a {len}-byte trampoline page");
        return Err(HookError::OutOfMemory);
    }
    Ok(ptr as *mut u8)
}

pub(super) unsafe fn free_exec(ptr: *mut u8, len: usize) {
    unsafe {
        libc::munmap(ptr as *mut c_void, len);
    }
}

pub(super) fn flush_icache(addr: *const u8, len: usize) {
    unsafe {
        inline_hook_clear_cache(addr as *mut c_void, (addr as usize + len) as *mut c_void);
    }
    #[cfg(target_arch = "aarch64")]
    unsafe {
        std::arch::asm!("dsb sy", "isb", options(nostack, nomem));
    }
}

pub(super) fn protect_rwx(start: usize, len: usize) -> Result<(), HookError> {
    protect(start, len, libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC)
}

pub(super) fn protect_rx(start: usize, len: usize) -> Result<(), HookError> {
    protect(start, len, libc::PROT_READ | libc::PROT_EXEC)
}

fn protect(start: usize, len: usize, prot: libc::c_int) -> Result<(), HookError> {
    let ok = unsafe { libc::mprotect(start as *mut c_void, len, prot) } == 0;
    if ok {
        Ok(())
    } else {
        Err(HookError::ProtectionFailed {
            source: std::io::Error::last_os_error(),
        })
    }
}
