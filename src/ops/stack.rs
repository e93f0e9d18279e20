//! Parameter-stack ops: `push`, `pop`, `dup`, `swap`. Grounded on the
//! reference implementation's `stack_ops.go`, adapted to the cached-head
//! (`pa`) model.

use crate::error::OpResult;
use crate::machine::Machine;

pub(crate) fn push(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    m.push(imm.expect("decode guarantees push carries a value immediate"))
}

pub(crate) fn pop(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    for _ in 0..imm.unwrap_or(1) {
        m.drop_top()?;
    }
    Ok(())
}

pub(crate) fn dup(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    let value = m.p_peek(imm.unwrap_or(1))?;
    m.push(value)
}

/// Swaps the top of stack with the value `i` slots below it (`i` defaults
/// to 1, i.e. swapping the top two values).
pub(crate) fn swap(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    let below = imm.unwrap_or(1) + 1;
    let top = m.p_peek(1)?;
    let other = m.p_peek(below)?;
    m.p_set(1, other)?;
    m.p_set(below, top)
}
