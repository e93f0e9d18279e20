//! The `program` module loads an encoded program image into a fresh
//! [`Machine`]. Grounded on the reference implementation's `api.go` `Load`.

use crate::error::{Error, OpResult};
use crate::machine::Machine;
use crate::page::PAGE_SIZE;

/// Program image format version this loader understands.
pub const VERSION: u8 = 0x00;

/// Parses and loads a program image, producing a fresh [`Machine`]
/// positioned at the start of its code.
///
/// Image layout: a version byte, a 16-bit big-endian stack size (shared by
/// the parameter and control stacks, which grow toward each other from
/// opposite ends of that region), and the raw code bytes. Code is placed at
/// the first page boundary strictly above the stack region (`cbp` itself is
/// part of the forbidden stack range, so a stack size that already lands on
/// a page boundary still advances a full page), per `SPEC_FULL.md` §3.
pub fn load(image: &[u8]) -> OpResult<Machine> {
    if image.len() < 3 {
        return Err(Error::InvalidIp);
    }
    let version = image[0];
    if version != VERSION {
        return Err(Error::InvalidIp);
    }
    let stack_size = u16::from_be_bytes([image[1], image[2]]) as u32;
    let code = &image[3..];

    let pbp = 0;
    let cbp = stack_size;
    let code_start = align_up(cbp, PAGE_SIZE);

    let mut m = Machine::new(pbp, cbp);
    m.pages_mut().store_bytes(code_start, code);
    m.jump_to(code_start)?;
    Ok(m)
}

/// Smallest multiple of `align` strictly greater than `addr` — `addr` itself
/// is part of the forbidden stack region (see `Machine::check_ip`), so an
/// already-aligned `addr` must still advance a full page.
fn align_up(addr: u32, align: u32) -> u32 {
    (addr / align + 1) * align
}
