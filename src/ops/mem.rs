//! Memory ops: `fetch`, `store`, `storeTo`. Grounded on `mem_ops.go`: the
//! address always comes off the stack (or the immediate) before the value.

use crate::error::OpResult;
use crate::machine::Machine;

pub(crate) fn fetch(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    let addr = match imm {
        Some(a) => a,
        None => m.pop()?,
    };
    let value = m.pages().fetch_word(addr)?;
    m.push(value)
}

pub(crate) fn store(m: &mut Machine, _imm: Option<u32>) -> OpResult<()> {
    let addr = m.pop()?;
    let value = m.pop()?;
    m.pages_mut().store_word(addr, value)
}

pub(crate) fn store_to(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    let addr = imm.expect("decode guarantees storeTo carries an address immediate");
    let value = m.pop()?;
    m.pages_mut().store_word(addr, value)
}
