//! The `ops` module implements every op's runtime effect and dispatches a
//! decoded op to the right one. See `SPEC_FULL.md` §4.3–§4.6.

mod arith;
mod bool_ops;
mod branch_ops;
mod cmp;
mod control;
mod fork_ops;
mod halt_ops;
mod mem;
mod stack;

use crate::context::ForkSink;
use crate::error::OpResult;
use crate::machine::Machine;
use crate::opcode::code;

/// Resolves an op's IP-relative offset: the immediate if present, otherwise
/// a value popped off the parameter stack.
pub(crate) fn resolve_offset(m: &mut Machine, imm: Option<u32>) -> OpResult<i32> {
    match imm {
        Some(v) => Ok(v as i32),
        None => Ok(m.pop()? as i32),
    }
}

/// Clones `m` and queues one of the two resulting machines, per
/// `SPEC_FULL.md` §4.6: a fork (`queue_clone_at_target = true`) sends the
/// clone to the jump target and lets `m` fall through; a branch sends the
/// clone to the fallthrough address and jumps `m` to the target itself.
pub(crate) fn spawn(
    m: &mut Machine,
    sink: &mut dyn ForkSink,
    imm: Option<u32>,
    queue_clone_at_target: bool,
) -> OpResult<()> {
    let offset = resolve_offset(m, imm)?;
    let target = (m.ip() as i32).wrapping_add(offset) as u32;
    m.check_ip(target)?;
    let mut clone = m.clone();
    if queue_clone_at_target {
        clone.jump_to(target)?;
        sink.queue(clone)
    } else {
        sink.queue(clone)?;
        m.jump_to(target)
    }
}

/// As [`spawn`], but pops a predicate first and only spawns when `test`
/// accepts it; otherwise the instruction is a no-op.
pub(crate) fn conditional_spawn(
    m: &mut Machine,
    sink: &mut dyn ForkSink,
    imm: Option<u32>,
    queue_clone_at_target: bool,
    test: impl FnOnce(u32) -> bool,
) -> OpResult<()> {
    let offset = resolve_offset(m, imm)?;
    let predicate = m.pop()?;
    if !test(predicate) {
        return Ok(());
    }
    let target = (m.ip() as i32).wrapping_add(offset) as u32;
    m.check_ip(target)?;
    let mut clone = m.clone();
    if queue_clone_at_target {
        clone.jump_to(target)?;
        sink.queue(clone)
    } else {
        sink.queue(clone)?;
        m.jump_to(target)
    }
}

/// Decodes and executes exactly one instruction. On failure, records the
/// cause on `m` before returning it.
pub(crate) fn step(m: &mut Machine, sink: &mut dyn ForkSink) -> OpResult<()> {
    let fault_ip = m.ip;
    let op = match m.decode_current() {
        Ok(op) => op,
        Err(e) => {
            m.set_err(fault_ip, e);
            return Err(e);
        }
    };
    m.ip = op.next_ip;
    let imm = op.imm;

    let result = match op.code {
        code::PUSH => stack::push(m, imm),
        code::POP => stack::pop(m, imm),
        code::DUP => stack::dup(m, imm),
        code::SWAP => stack::swap(m, imm),

        code::FETCH => mem::fetch(m, imm),
        code::STORE => mem::store(m, imm),
        code::STORE_TO => mem::store_to(m, imm),

        code::ADD => arith::add(m, imm),
        code::SUB => arith::sub(m, imm),
        code::MUL => arith::mul(m, imm),
        code::DIV => arith::div(m, imm),
        code::MOD => arith::modulo(m, imm),
        code::DIVMOD => arith::divmod(m, imm),
        code::NEG => arith::neg(m, imm),

        code::LT => cmp::lt(m, imm),
        code::LTE => cmp::lte(m, imm),
        code::GT => cmp::gt(m, imm),
        code::GTE => cmp::gte(m, imm),
        code::EQ => cmp::eq(m, imm),
        code::NEQ => cmp::neq(m, imm),

        code::NOT => bool_ops::not(m, imm),
        code::AND => bool_ops::and(m, imm),
        code::OR => bool_ops::or(m, imm),

        code::CPUSH => control::cpush(m, imm),
        code::CPOP => control::cpop(m, imm),
        code::P2C => control::p2c(m, imm),
        code::C2P => control::c2p(m, imm),
        code::MARK => control::mark(m, imm),

        code::JUMP => control::jump(m, imm),
        code::JNZ => control::jnz(m, imm),
        code::JZ => control::jz(m, imm),
        code::LOOP => control::loop_op(m, imm),
        code::LNZ => control::lnz(m, imm),
        code::LZ => control::lz(m, imm),
        code::CALL => control::call(m, imm),
        code::RET => control::ret(m, imm),

        code::FORK => fork_ops::fork(m, sink, imm),
        code::FNZ => fork_ops::fnz(m, sink, imm),
        code::FZ => fork_ops::fz(m, sink, imm),

        code::BRANCH => branch_ops::branch(m, sink, imm),
        code::BNZ => branch_ops::bnz(m, sink, imm),
        code::BZ => branch_ops::bz(m, sink, imm),

        code::HNZ => halt_ops::hnz(m, imm),
        code::HZ => halt_ops::hz(m, imm),
        code::HALT => halt_ops::halt(m, imm),

        _ => Err(crate::error::Error::InvalidOp),
    };

    if let Err(e) = result {
        m.set_err(fault_ip, e);
    }
    result
}
