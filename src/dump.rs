//! Rendering a hook's bytes to a human-readable, disassembler-friendly buffer.

use crate::arch::BODY_CAPACITY;
use crate::engine::HookHandle;
use std::fmt::Write as _;

/// Render `[INJECT]`, `[BACKUP]`, and `[OPCODE]` sections for `handle`,
/// address-prefixed so the output lines up with an external disassembler.
///
/// The redirect and backup sections are however many bytes long the chosen
/// form actually is (5 for the x86-64 near form, 14 for the far form, and
/// correspondingly 4/12 on ARM) so a reader can tell which path was taken
/// just from the row count.
pub fn dump(handle: &HookHandle) -> String {
    let record = &handle.0;
    let mut out = String::new();

    let _ = writeln!(out, "[INJECT]");
    write_rows(&mut out, record.target as usize, &record.redirect.bytes[..record.redirect.len]);

    let _ = writeln!(out, "[BACKUP]");
    write_rows(&mut out, record.target as usize, &record.backup[..record.redirect.len]);

    let _ = writeln!(out, "[OPCODE]");
    let body = unsafe { std::slice::from_raw_parts(record.body_ptr(), BODY_CAPACITY) };
    write_rows(&mut out, record.body_ptr() as usize, body);

    out
}

fn write_rows(out: &mut String, base_addr: usize, bytes: &[u8]) {
    for (i, row) in bytes.chunks(8).enumerate() {
        let _ = write!(out, "{:#018x} |", base_addr + i * 8);
        for b in row {
            let _ = write!(out, " {b:02x}");
        }
        let _ = writeln!(out);
    }
}
