//! Fork ops: `fork`, `fnz`, `fz`. A fork queues a clone at the jump target
//! and leaves the original running in place. Grounded on
//! `control_fork_ops.go`.

use super::{conditional_spawn, spawn};
use crate::context::ForkSink;
use crate::error::OpResult;
use crate::machine::Machine;

pub(crate) fn fork(m: &mut Machine, sink: &mut dyn ForkSink, imm: Option<u32>) -> OpResult<()> {
    spawn(m, sink, imm, true)
}

pub(crate) fn fnz(m: &mut Machine, sink: &mut dyn ForkSink, imm: Option<u32>) -> OpResult<()> {
    conditional_spawn(m, sink, imm, true, |p| p != 0)
}

pub(crate) fn fz(m: &mut Machine, sink: &mut dyn ForkSink, imm: Option<u32>) -> OpResult<()> {
    conditional_spawn(m, sink, imm, true, |p| p == 0)
}
