//! x86-64 jump encoding and prologue relocation.
//!
//! Decoding uses `iced-x86`, the same variable-length x86 decoder/encoder
//! pair used by hypervisor-grade inline hookers in the Rust ecosystem for
//! exactly this job.

use super::{BODY_CAPACITY, IsaBackend, Redirect};
use crate::error::HookError;
use iced_x86::{ConditionCode, Decoder, DecoderOptions, Instruction, Mnemonic};

const REDIRECT_LONG_LEN: usize = 14;
const TRAP_BYTE: u8 = 0xCC;

/// Offset of the ext-area thunk table inside the trampoline body. Up to
/// three 14-byte thunks fit between here and `BODY_CAPACITY`, covering the
/// worst case of the entire 5-byte redirect window consisting of two-byte
/// `JECXZ`-family instructions.
const EXT_START: usize = 96;

pub struct X86_64;

impl IsaBackend for X86_64 {
    const MAX_REDIRECT_LEN: usize = REDIRECT_LONG_LEN;
    const TRAP_BYTE: u8 = TRAP_BYTE;

    fn encode_redirect(src: *const u8, dst: *const u8) -> Redirect {
        let mut bytes = [TRAP_BYTE; REDIRECT_LONG_LEN];
        let diff = (dst as i64).wrapping_sub(src as i64 + 5);
        if let Ok(rel32) = i32::try_from(diff) {
            bytes[0] = 0xE9;
            bytes[1..5].copy_from_slice(&rel32.to_le_bytes());
            Redirect { bytes, len: 5 }
        } else {
            // FF 25 00 00 00 00 <abs64>: jmp qword ptr [rip]; the literal
            // address sits immediately after the instruction.
            bytes[0] = 0xFF;
            bytes[1] = 0x25;
            bytes[2..6].copy_from_slice(&0u32.to_le_bytes());
            bytes[6..14].copy_from_slice(&(dst as u64).to_le_bytes());
            Redirect { bytes, len: 14 }
        }
    }

    unsafe fn relocate_prologue(
        target: *const u8,
        body: &mut [u8; BODY_CAPACITY],
        min_bytes: usize,
    ) -> Result<usize, HookError> {
        let code = unsafe { std::slice::from_raw_parts(target, BODY_CAPACITY) };
        let mut decoder = Decoder::with_ip(64, code, target as u64, DecoderOptions::NONE);

        body.fill(TRAP_BYTE);

        let mut o_offset = 0usize;
        let mut ext_offset = EXT_START;
        let mut consumed = 0usize;
        let mut instr = Instruction::default();

        while consumed < min_bytes {
            decoder.decode_out(&mut instr);
            if instr.is_invalid() {
                return Err(HookError::DecoderFailed);
            }
            let insn_len = instr.len();

            if matches!(instr.mnemonic(), Mnemonic::Ret | Mnemonic::Retf) {
                return Err(HookError::UnsafePrologue {
                    reason: "RET inside the redirect window",
                });
            }

            if o_offset + insn_len + REDIRECT_LONG_LEN > EXT_START {
                return Err(HookError::UnsafePrologue {
                    reason: "relocated prologue overflowed the trampoline's main area",
                });
            }

            if matches!(instr.mnemonic(), Mnemonic::Jcxz | Mnemonic::Jecxz) {
                // Only a short rel8 form exists; keep it pointing at an
                // ext-area thunk that holds the real jump to the original
                // destination.
                let dest = instr.near_branch_target() as *const u8;
                let thunk = unsafe { body.as_ptr().add(ext_offset) };
                let rel8 = (thunk as i64) - (unsafe { body.as_ptr().add(o_offset) } as i64 + 2);
                body[o_offset] = 0xE3;
                body[o_offset + 1] = rel8 as i8 as u8;
                o_offset += 2;

                let r = Self::encode_redirect(thunk, dest);
                if ext_offset + r.len > BODY_CAPACITY {
                    return Err(HookError::UnsafePrologue {
                        reason: "ext-area thunk table exhausted",
                    });
                }
                body[ext_offset..ext_offset + r.len].copy_from_slice(&r.bytes[..r.len]);
                ext_offset += r.len;
            } else if instr.is_jcc_short_or_near() {
                let opcode2 = condition_code_opcode(instr.condition_code());
                let dest = instr.near_branch_target() as i64;
                let src = unsafe { body.as_ptr().add(o_offset) } as i64;
                let rel32 = (dest - (src + 6)) as i32;
                body[o_offset] = 0x0F;
                body[o_offset + 1] = opcode2;
                body[o_offset + 2..o_offset + 6].copy_from_slice(&rel32.to_le_bytes());
                o_offset += 6;
            } else if instr.is_jmp_short_or_near() {
                let dest = instr.near_branch_target() as *const u8;
                let src = unsafe { body.as_ptr().add(o_offset) };
                let r = Self::encode_redirect(src, dest);
                body[o_offset..o_offset + r.len].copy_from_slice(&r.bytes[..r.len]);
                o_offset += r.len;
            } else {
                // Not in the recognized control-flow vocabulary: copy the
                // raw bytes unchanged. Only correct for position-independent
                // instructions; see the crate-level "Known limitations" docs.
                body[o_offset..o_offset + insn_len]
                    .copy_from_slice(&code[consumed..consumed + insn_len]);
                o_offset += insn_len;
            }

            consumed += insn_len;
        }

        let tail_src = unsafe { body.as_ptr().add(o_offset) };
        let tail_dst = unsafe { target.add(consumed) };
        let r = Self::encode_redirect(tail_src, tail_dst);
        if o_offset + r.len > EXT_START {
            return Err(HookError::UnsafePrologue {
                reason: "tail jump overflowed the trampoline's main area",
            });
        }
        body[o_offset..o_offset + r.len].copy_from_slice(&r.bytes[..r.len]);

        Ok(consumed)
    }
}

/// Maps a decoded `Jcc`'s condition to the second opcode byte of its
/// `0F 8x rel32` near form.
fn condition_code_opcode(cc: ConditionCode) -> u8 {
    match cc {
        ConditionCode::o => 0x80,
        ConditionCode::no => 0x81,
        ConditionCode::b => 0x82,
        ConditionCode::ae => 0x83,
        ConditionCode::e => 0x84,
        ConditionCode::ne => 0x85,
        ConditionCode::be => 0x86,
        ConditionCode::a => 0x87,
        ConditionCode::s => 0x88,
        ConditionCode::ns => 0x89,
        ConditionCode::p => 0x8A,
        ConditionCode::np => 0x8B,
        ConditionCode::l => 0x8C,
        ConditionCode::ge => 0x8D,
        ConditionCode::le => 0x8E,
        ConditionCode::g => 0x8F,
        ConditionCode::None => unreachable!("is_jcc_short_or_near implies a condition code"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_redirect_fits_in_five_bytes() {
        let src = 0x1000_0000usize as *const u8;
        let dst = 0x1000_1000usize as *const u8;
        let r = X86_64::encode_redirect(src, dst);
        assert_eq!(r.len, 5);
        assert_eq!(r.bytes[0], 0xE9);
    }

    #[test]
    fn far_redirect_used_beyond_2gib() {
        let src = 0x0000_1000usize as *const u8;
        let dst = 0x7fff_ffff_0000usize as *const u8;
        let r = X86_64::encode_redirect(src, dst);
        assert_eq!(r.len, 14);
        assert_eq!(&r.bytes[0..2], &[0xFF, 0x25]);
        assert_eq!(
            u64::from_le_bytes(r.bytes[6..14].try_into().unwrap()),
            dst as u64
        );
    }
}
