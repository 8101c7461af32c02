//! Inline function hooking (detours) for x86-64 and ARM/AArch64, on Linux
//! and Windows.
//!
//! Given the address of a `target` function and a `detour` function, this
//! crate rewrites `target`'s prologue so that calls to it transparently
//! reach `detour`, while generating a *trampoline* that still behaves like
//! the unpatched `target`. This is the classic "inline hook" technique used
//! by runtime instrumentation, API interception, and testing shims; it is
//! not an ELF GOT/PLT-rewriting hook (a different, easier mechanism this
//! crate does not implement) and it has no opinion on how a caller locates
//! `target`'s address.
//!
//! ```no_run
//! # unsafe extern "C" fn add(a: i32, b: i32) -> i32 { a + b }
//! # unsafe extern "C" fn sub(a: i32, b: i32) -> i32 { a - b }
//! # unsafe fn demo() -> Result<(), inline_hook::HookError> {
//! let handle = unsafe { inline_hook::inject(add as *const (), sub as *const ()) }?;
//! let trampoline: unsafe extern "C" fn(i32, i32) -> i32 = unsafe { handle.as_fn() };
//! assert_eq!(unsafe { add(4, 1) }, 3); // now redirected to `sub`
//! assert_eq!(unsafe { trampoline(4, 1) }, 5); // still behaves like the original `add`
//! unsafe { inline_hook::uninject(handle) };
//! assert_eq!(unsafe { add(4, 1) }, 5);
//! # Ok(())
//! # }
//! ```
//!
//! # Known limitations
//!
//! The prologue relocator recognizes a bounded vocabulary of control-flow
//! instructions (near/short jumps and conditional jumps on x86-64) and
//! re-emits them so they still reach their original destination from the
//! trampoline's different address. Any other instruction is copied
//! byte-for-byte into the trampoline. That is only correct if the
//! instruction is position-independent; an instruction such as
//! `lea rax, [rip+disp32]` would silently compute the wrong address once
//! relocated, because the crate does not re-relativize RIP-relative memory
//! operands. Hand-picked prologues containing such instructions are outside
//! this crate's support; ordinary compiler-generated prologues rarely
//! contain them in the first few bytes. See `DESIGN.md` for the reasoning
//! behind keeping this permissive rather than rejecting such instructions
//! outright.
//!
//! Hooking an already-hooked target, hooking a target shorter than the
//! required redirect window, and safe patching of a target that is
//! concurrently executing on another thread, are all out of scope; see the
//! crate's `SPEC_FULL.md` for the full non-goal list.

mod arch;
mod dump;
mod engine;
mod error;
mod ffi;
mod platform;
mod trampoline;

pub use dump::dump;
pub use engine::{inject, uninject, HookHandle};
pub use error::HookError;
