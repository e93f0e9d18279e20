//! A minimal internal assembler used only by this crate's own scenario
//! tests. Turns a list of mnemonics (with optional immediates, or a label
//! to resolve into a jump offset or an absolute address) into an encoded
//! program. A full textual assembler is a separate, out-of-scope tool; this
//! exists purely so tests can be written as instruction lists instead of raw
//! bytes.

use std::collections::HashMap;

use crate::decode::encode_into;
use crate::opcode::lookup_by_name;

pub enum Asm {
    /// A plain op, with an immediate if it takes one.
    Op(&'static str, Option<u32>),
    /// An op whose immediate is a jump offset to `label`, resolved relative
    /// to the address immediately following this op.
    OpTo(&'static str, &'static str),
    /// An op whose immediate is `label`'s absolute address (e.g. `call`).
    OpAt(&'static str, &'static str),
    /// Marks the current address under `name` for `OpTo`/`OpAt` to resolve
    /// against.
    Label(&'static str),
}

pub fn op(name: &'static str) -> Asm {
    Asm::Op(name, None)
}

pub fn opi(name: &'static str, imm: u32) -> Asm {
    Asm::Op(name, Some(imm))
}

pub fn to(name: &'static str, label: &'static str) -> Asm {
    Asm::OpTo(name, label)
}

pub fn at(name: &'static str, label: &'static str) -> Asm {
    Asm::OpAt(name, label)
}

pub fn label(name: &'static str) -> Asm {
    Asm::Label(name)
}

/// Assembles `items` by relaxation: guesses every jump's encoded length at
/// its maximum, resolves label addresses, shrinks lengths to what the
/// resolved offsets actually need, and repeats until lengths stop changing.
pub fn assemble(items: &[Asm]) -> Vec<u8> {
    let mut lengths = vec![6u32; items.len()];

    loop {
        let mut addrs = vec![0u32; items.len()];
        let mut labels: HashMap<&str, u32> = HashMap::new();
        let mut addr = 0u32;
        for (i, item) in items.iter().enumerate() {
            addrs[i] = addr;
            match item {
                Asm::Label(name) => {
                    labels.insert(name, addr);
                }
                _ => addr += lengths[i],
            }
        }

        let mut new_lengths = lengths.clone();
        let mut changed = false;
        for (i, item) in items.iter().enumerate() {
            let len = match item {
                Asm::Label(_) => 0,
                Asm::Op(_, imm) => encoded_len(*imm),
                Asm::OpTo(_, target_label) => {
                    let next_ip = addrs[i] + lengths[i];
                    let target = *labels
                        .get(target_label)
                        .unwrap_or_else(|| panic!("undefined label {target_label}"));
                    let offset = (target as i64 - next_ip as i64) as i32;
                    encoded_len(Some(offset as u32))
                }
                Asm::OpAt(_, target_label) => {
                    let target = *labels
                        .get(target_label)
                        .unwrap_or_else(|| panic!("undefined label {target_label}"));
                    encoded_len(Some(target))
                }
            };
            if len != new_lengths[i] {
                changed = true;
            }
            new_lengths[i] = len;
        }
        lengths = new_lengths;

        if !changed {
            let total = addrs.last().copied().unwrap_or(0) + lengths.last().copied().unwrap_or(0);
            let mut out = vec![0u8; total as usize];
            for (i, item) in items.iter().enumerate() {
                match item {
                    Asm::Label(_) => {}
                    Asm::Op(name, imm) => {
                        let (code, _) = lookup_by_name(name)
                            .unwrap_or_else(|| panic!("unknown mnemonic {name}"));
                        write_at(&mut out, addrs[i], code, *imm);
                    }
                    Asm::OpTo(name, target_label) => {
                        let (code, _) = lookup_by_name(name)
                            .unwrap_or_else(|| panic!("unknown mnemonic {name}"));
                        let next_ip = addrs[i] + lengths[i];
                        let target = labels[target_label];
                        let offset = (target as i64 - next_ip as i64) as i32;
                        write_at(&mut out, addrs[i], code, Some(offset as u32));
                    }
                    Asm::OpAt(name, target_label) => {
                        let (code, _) = lookup_by_name(name)
                            .unwrap_or_else(|| panic!("unknown mnemonic {name}"));
                        let target = labels[target_label];
                        write_at(&mut out, addrs[i], code, Some(target));
                    }
                }
            }
            return out;
        }
    }
}

fn write_at(out: &mut [u8], addr: u32, code: u8, imm: Option<u32>) {
    let mut buf = [0u8; 6];
    let n = encode_into(&mut buf, code, imm);
    let a = addr as usize;
    out[a..a + n].copy_from_slice(&buf[..n]);
}

fn encoded_len(imm: Option<u32>) -> u32 {
    match imm {
        None => 1,
        Some(mut v) => {
            let mut n = 1u32;
            loop {
                n += 1;
                v >>= 7;
                if v == 0 {
                    break;
                }
            }
            n
        }
    }
}

/// Wraps `code` in a minimal program image: version byte, stack size, code.
pub fn image(stack_size: u16, code: &[u8]) -> Vec<u8> {
    let mut out = vec![crate::program::VERSION];
    out.extend_from_slice(&stack_size.to_be_bytes());
    out.extend_from_slice(code);
    out
}
