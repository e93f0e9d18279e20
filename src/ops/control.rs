//! Control-stack and non-speculative control-flow ops: `cpush`, `cpop`,
//! `p2c`, `c2p`, `mark`, `jump`/`jnz`/`jz`, `loop`/`lnz`/`lz`, `call`/`ret`.
//! Grounded on `control_ops.go`.

use super::resolve_offset;
use crate::error::OpResult;
use crate::machine::Machine;

pub(crate) fn cpush(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    m.cpush(imm.expect("decode guarantees cpush carries a value immediate"))
}

pub(crate) fn cpop(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    for _ in 0..imm.unwrap_or(1) {
        m.cdrop()?;
    }
    Ok(())
}

/// Moves `n` values (default 1) from the parameter stack to the control
/// stack.
pub(crate) fn p2c(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    for _ in 0..imm.unwrap_or(1) {
        let v = m.pop()?;
        m.cpush(v)?;
    }
    Ok(())
}

/// Moves `n` values (default 1) from the control stack to the parameter
/// stack.
pub(crate) fn c2p(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    for _ in 0..imm.unwrap_or(1) {
        let v = m.cpop()?;
        m.push(v)?;
    }
    Ok(())
}

/// Pushes the address of the next instruction onto the control stack, for
/// `loop`/`lnz`/`lz` to jump back to.
pub(crate) fn mark(m: &mut Machine, _imm: Option<u32>) -> OpResult<()> {
    m.cpush(m.ip())
}

pub(crate) fn jump(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    let offset = resolve_offset(m, imm)?;
    m.jump_by(offset)
}

pub(crate) fn jnz(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    conditional_jump(m, imm, |p| p != 0)
}

pub(crate) fn jz(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    conditional_jump(m, imm, |p| p == 0)
}

fn conditional_jump(m: &mut Machine, imm: Option<u32>, test: impl FnOnce(u32) -> bool) -> OpResult<()> {
    let offset = resolve_offset(m, imm)?;
    let predicate = m.pop()?;
    if test(predicate) {
        m.jump_by(offset)
    } else {
        Ok(())
    }
}

/// Jumps to the address on top of the control stack without popping it.
pub(crate) fn loop_op(m: &mut Machine, _imm: Option<u32>) -> OpResult<()> {
    let target = m.cpeek()?;
    m.jump_to(target)
}

pub(crate) fn lnz(m: &mut Machine, _imm: Option<u32>) -> OpResult<()> {
    conditional_loop(m, |p| p != 0)
}

pub(crate) fn lz(m: &mut Machine, _imm: Option<u32>) -> OpResult<()> {
    conditional_loop(m, |p| p == 0)
}

/// Pops a predicate; if it satisfies `test`, jumps to the marker on top of
/// the control stack (keeping it for the next iteration), otherwise drops
/// the marker and falls through.
fn conditional_loop(m: &mut Machine, test: impl FnOnce(u32) -> bool) -> OpResult<()> {
    let predicate = m.pop()?;
    let target = m.cpeek()?;
    if test(predicate) {
        m.jump_to(target)
    } else {
        m.cdrop()
    }
}

pub(crate) fn call(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    let target = match imm {
        Some(a) => a,
        None => m.pop()?,
    };
    let return_addr = m.ip();
    m.cpush(return_addr)?;
    m.jump_to(target)
}

pub(crate) fn ret(m: &mut Machine, _imm: Option<u32>) -> OpResult<()> {
    let target = m.cpop()?;
    m.jump_to(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_then_ret_returns_to_the_instruction_after_call() {
        let mut m = Machine::new(0, 0x1000);
        m.jump_to(0x2000).unwrap();
        call(&mut m, Some(0x3000)).unwrap();
        assert_eq!(m.ip(), 0x3000);
        ret(&mut m, None).unwrap();
        assert_eq!(m.ip(), 0x2000);
    }

    #[test]
    fn loop_holds_its_marker_until_the_predicate_clears() {
        let mut m = Machine::new(0, 0x1000);
        m.jump_to(0x2000).unwrap();
        mark(&mut m, None).unwrap();
        m.push(1).unwrap();
        lnz(&mut m, None).unwrap();
        assert_eq!(m.ip(), 0x2000);
        m.push(0).unwrap();
        lnz(&mut m, None).unwrap();
        assert_eq!(m.ip(), 0x2000);
        assert!(m.cpeek().is_err());
    }
}
