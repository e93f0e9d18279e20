//! Branch ops: `branch`, `bnz`, `bz`. A branch queues the original (to
//! resume at the fallthrough address later) and takes the jump target
//! itself. Grounded on `control_branch_ops.go`.

use super::{conditional_spawn, spawn};
use crate::context::ForkSink;
use crate::error::OpResult;
use crate::machine::Machine;

pub(crate) fn branch(m: &mut Machine, sink: &mut dyn ForkSink, imm: Option<u32>) -> OpResult<()> {
    spawn(m, sink, imm, false)
}

pub(crate) fn bnz(m: &mut Machine, sink: &mut dyn ForkSink, imm: Option<u32>) -> OpResult<()> {
    conditional_spawn(m, sink, imm, false, |p| p != 0)
}

pub(crate) fn bz(m: &mut Machine, sink: &mut dyn ForkSink, imm: Option<u32>) -> OpResult<()> {
    conditional_spawn(m, sink, imm, false, |p| p == 0)
}
