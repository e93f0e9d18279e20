//! Halt ops: `halt`, `hz`, `hnz`. Grounded on `control_halt_ops.go`, adapted
//! from Go's "halt codes double as the `error` interface" trick to a plain
//! variant of [`crate::Error`].

use crate::error::{Error, OpResult};
use crate::machine::Machine;

pub(crate) fn halt(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    m.fail(Error::Halt(
        imm.expect("decode guarantees halt carries a value immediate"),
    ))
}

pub(crate) fn hnz(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    conditional_halt(m, imm, |p| p != 0)
}

pub(crate) fn hz(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    conditional_halt(m, imm, |p| p == 0)
}

fn conditional_halt(m: &mut Machine, imm: Option<u32>, test: impl FnOnce(u32) -> bool) -> OpResult<()> {
    let code = imm.expect("decode guarantees hz/hnz carry a value immediate");
    let predicate = m.pop()?;
    if test(predicate) {
        m.fail(Error::Halt(code))
    } else {
        Ok(())
    }
}
