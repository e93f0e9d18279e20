//! Comparison ops: `lt`, `lte`, `gt`, `gte`, `eq`, `neq`. Unsigned 32-bit
//! comparison, matching the reference implementation's `logical_ops.go`
//! (comparisons operate on the raw register word, not a signed view of it).

use crate::error::OpResult;
use crate::machine::Machine;

fn compare(m: &mut Machine, imm: Option<u32>, f: impl FnOnce(u32, u32) -> bool) -> OpResult<()> {
    let b = match imm {
        Some(v) => v,
        None => m.pop()?,
    };
    let a = m.p_peek(1)?;
    m.p_set(1, f(a, b) as u32)
}

pub(crate) fn lt(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    compare(m, imm, |a, b| a < b)
}

pub(crate) fn lte(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    compare(m, imm, |a, b| a <= b)
}

pub(crate) fn gt(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    compare(m, imm, |a, b| a > b)
}

pub(crate) fn gte(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    compare(m, imm, |a, b| a >= b)
}

pub(crate) fn eq(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    compare(m, imm, |a, b| a == b)
}

pub(crate) fn neq(m: &mut Machine, imm: Option<u32>) -> OpResult<()> {
    compare(m, imm, |a, b| a != b)
}
