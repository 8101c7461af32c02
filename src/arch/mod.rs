//! ISA dispatch: one backend per architecture, selected at compile time
//! since trampoline bytes execute directly on whatever ISA this crate was
//! built for.

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86_64;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use self::x86_64::X86_64 as Backend;

#[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
mod arm;
#[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
pub use self::arm::Arm as Backend;

use crate::error::HookError;

/// The maximum number of bytes a redirect can ever take on this ISA
/// (the "far"/long form).
pub const MAX_REDIRECT_LEN: usize = Backend::MAX_REDIRECT_LEN;

/// Capacity of the trampoline body: relocated prologue + tail jump + the
/// ext-area thunk table. One page is always allocated regardless, so this
/// is a generous fixed upper bound rather than a tight one.
pub const BODY_CAPACITY: usize = 256;

/// The result of encoding a redirect: the bytes actually written and how
/// many of them are live.
pub struct Redirect {
    pub bytes: [u8; MAX_REDIRECT_LEN],
    pub len: usize,
}

/// Capabilities a patch engine needs from an ISA backend.
pub trait IsaBackend {
    /// Byte length of the long/far redirect form (the short form's length
    /// is implied by `Redirect::len` on the short path).
    const MAX_REDIRECT_LEN: usize;

    /// The fill byte used to pad unreachable trampoline bytes so stray
    /// control flow traps instead of running off the end.
    const TRAP_BYTE: u8;

    /// Encode a jump from `src` to `dst`, picking the shortest form that reaches.
    fn encode_redirect(src: *const u8, dst: *const u8) -> Redirect;

    /// Decode and relocate the instructions at `target` until at least
    /// `min_bytes` of the original prologue have been consumed, writing the
    /// relocated prologue plus a tail jump back to `target + consumed` into
    /// `body` (already allocated at its final runtime address — relative
    /// branches are computed against `body`'s real address, not a staging
    /// buffer). Returns the number of target bytes consumed.
    ///
    /// # Safety
    /// `target` must point to at least `BODY_CAPACITY` readable bytes of
    /// real executable code.
    unsafe fn relocate_prologue(
        target: *const u8,
        body: &mut [u8; BODY_CAPACITY],
        min_bytes: usize,
    ) -> Result<usize, HookError>;
}
