use thiserror::Error;

/// Everything that can go wrong while installing or removing an inline hook.
///
/// Each variant maps to one of the stable negative FFI error codes in
/// [`crate::ffi`]; see [`HookError::as_ffi_code`].
#[derive(Debug, Error)]
pub enum HookError {
    /// Allocating the executable page for the trampoline failed.
    #[error("failed to allocate executable memory for the trampoline")]
    OutOfMemory,

    /// A `RET`-class instruction appeared inside the bytes that must be
    /// overwritten by the redirect, or the decoder could not classify an
    /// instruction at the boundary it stopped on.
    #[error("target prologue is not safe to relocate: {reason}")]
    UnsafePrologue { reason: &'static str },

    /// A relative branch inside the prologue could not be re-expressed in
    /// any of the forms this ISA backend supports.
    #[error("branch destination cannot be encoded for this architecture")]
    EncodingOutOfRange,

    /// The OS refused to toggle memory protection on the target page.
    #[error("failed to change memory protection on target page: {source}")]
    ProtectionFailed {
        #[source]
        source: std::io::Error,
    },

    /// The instruction decoder reported an error before enough bytes had
    /// been consumed to cover the redirect window.
    #[error("instruction decoder failed before consuming the redirect window")]
    DecoderFailed,

    /// `inject` was called again on a target address that is already hooked.
    /// Not part of the original error taxonomy's stable codes; surfaced as
    /// the generic/unknown code at the FFI boundary.
    #[error("target is already hooked; uninject it before hooking it again")]
    AlreadyHooked,
}

impl HookError {
    /// The stable negative error code exposed across the `extern "C"` boundary.
    pub fn as_ffi_code(&self) -> i32 {
        match self {
            HookError::AlreadyHooked => -1,
            HookError::OutOfMemory => -2,
            HookError::UnsafePrologue { .. } => -3,
            HookError::EncodingOutOfRange => -1,
            HookError::ProtectionFailed { .. } => -1,
            HookError::DecoderFailed => -1,
        }
    }
}
