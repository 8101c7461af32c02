//! ARM (32-bit A32 and, by the same word-oriented scheme, AArch64) jump
//! encoding and prologue relocation.
//!
//! Unlike x86-64 there is no instruction decoder here: the prologue is
//! fixed-width 4-byte words, and the original source copies the first one
//! or three words verbatim rather than scanning them for control flow. This
//! implementation preserves that behavior; see `DESIGN.md` for the tradeoff.

use super::{BODY_CAPACITY, IsaBackend, Redirect};
use crate::error::HookError;

const REDIRECT_FAR_LEN: usize = 12;
const REDIRECT_NEAR_LEN: usize = 4;

/// `udf #0`, little-endian. ARM has no single-byte trap opcode, so unused
/// trampoline bytes are filled word-at-a-time with this instead of `0xCC`.
const TRAP_WORD: [u8; 4] = [0xF0, 0x00, 0xF0, 0xE7];

pub struct Arm;

impl IsaBackend for Arm {
    const MAX_REDIRECT_LEN: usize = REDIRECT_FAR_LEN;
    const TRAP_BYTE: u8 = 0xE7;

    fn encode_redirect(src: *const u8, dst: *const u8) -> Redirect {
        let mut bytes = [0u8; REDIRECT_FAR_LEN];
        let diff = (dst as isize) - (src as isize);
        if (-0x200_0000..0x200_0000).contains(&diff) {
            let word = (((diff - 8) >> 2) as u32 & 0x00FF_FFFF) | 0xEA00_0000;
            bytes[0..4].copy_from_slice(&word.to_le_bytes());
            Redirect { bytes, len: 4 }
        } else {
            let dest = dst as u32;
            let low = dest & 0x0000_FFFF;
            let high = (dest >> 16) & 0x0000_FFFF;
            // movw r0, #low16
            let movw = (low & 0x0FFF) | ((low & 0xF000) << 4) | 0xE300_0000;
            // movt r0, #high16
            let movt = (high & 0x0FFF) | ((high & 0xF000) << 4) | 0xE340_0000;
            // bx r0
            let bx = 0xE12F_FF10u32;
            bytes[0..4].copy_from_slice(&movw.to_le_bytes());
            bytes[4..8].copy_from_slice(&movt.to_le_bytes());
            bytes[8..12].copy_from_slice(&bx.to_le_bytes());
            Redirect { bytes, len: 12 }
        }
    }

    unsafe fn relocate_prologue(
        target: *const u8,
        body: &mut [u8; BODY_CAPACITY],
        min_bytes: usize,
    ) -> Result<usize, HookError> {
        debug_assert!(min_bytes == REDIRECT_NEAR_LEN || min_bytes == REDIRECT_FAR_LEN);

        for chunk in body.chunks_exact_mut(4) {
            chunk.copy_from_slice(&TRAP_WORD);
        }

        let code = unsafe { std::slice::from_raw_parts(target, min_bytes) };
        body[0..min_bytes].copy_from_slice(code);

        let tail_src = unsafe { body.as_ptr().add(min_bytes) };
        let tail_dst = unsafe { target.add(min_bytes) };
        let r = Self::encode_redirect(tail_src, tail_dst);
        body[min_bytes..min_bytes + r.len].copy_from_slice(&r.bytes[..r.len]);

        Ok(min_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_branch_within_32mib() {
        let src = 0x0001_0000usize as *const u8;
        let dst = 0x0002_0000usize as *const u8;
        let r = Arm::encode_redirect(src, dst);
        assert_eq!(r.len, 4);
        assert_eq!(r.bytes[3] & 0xFF, 0xEA);
    }

    #[test]
    fn far_branch_beyond_32mib() {
        let src = 0x0000_0000usize as *const u8;
        let dst = 0x7000_0000usize as *const u8;
        let r = Arm::encode_redirect(src, dst);
        assert_eq!(r.len, 12);
    }
}
