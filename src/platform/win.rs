use crate::error::HookError;
use windows::Win32::System::Diagnostics::Debug::FlushInstructionCache;
use windows::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, VirtualProtect, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE,
    PAGE_EXECUTE_READ, PAGE_EXECUTE_READWRITE, PAGE_PROTECTION_FLAGS,
};
use windows::Win32::System::Threading::GetCurrentProcess;

pub(super) fn query_page_size() -> usize {
    let mut info = windows::Win32::System::SystemInformation::SYSTEM_INFO::default();
    unsafe { windows::Win32::System::SystemInformation::GetSystemInfo(&mut info) };
    info.dwPageSize as usize
}

pub(super) fn alloc_exec(len: usize) -> Result<*mut u8, HookError> {
    let ptr = unsafe {
        VirtualAlloc(
            None,
            len,
            MEM_COMMIT | MEM_RESERVE,
            PAGE_EXECUTE_READWRITE,
        )
    };
    if ptr.is_null() {
        log::warn!("VirtualAlloc failed while allocating a {len}-byte trampoline page");
        return Err(HookError::OutOfMemory);
    }
    Ok(ptr as *mut u8)
}

pub(super) unsafe fn free_exec(ptr: *mut u8, _len: usize) {
    unsafe {
        let _ = VirtualFree(ptr as *mut _, 0, MEM_RELEASE);
    }
}

pub(super) fn flush_icache(addr: *const u8, len: usize) {
    unsafe {
        let process = GetCurrentProcess();
        let _ = FlushInstructionCache(process, Some(addr as *const _), len);
    }
}

pub(super) fn protect_rwx(start: usize, len: usize) -> Result<(), HookError> {
    protect(start, len, PAGE_EXECUTE_READWRITE)
}

pub(super) fn protect_rx(start: usize, len: usize) -> Result<(), HookError> {
    protect(start, len, PAGE_EXECUTE_READ)
}

fn protect(start: usize, len: usize, flags: PAGE_PROTECTION_FLAGS) -> Result<(), HookError> {
    let mut old = PAGE_PROTECTION_FLAGS::default();
    unsafe { VirtualProtect(start as *mut _, len, flags, &mut old) }.map_err(|e| {
        HookError::ProtectionFailed {
            source: std::io::Error::from_raw_os_error(e.code().0),
        }
    })
}
