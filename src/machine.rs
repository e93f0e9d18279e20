//! The `machine` module holds the [`Machine`] struct: its registers, its
//! stack discipline, and the primitives every op is built from.

use std::fmt;

use crate::decode::{DecodeCache, DecodedOp};
use crate::error::{Error, MachineError, OpResult, StackKind};
use crate::page::PageTable;

/// Sentinel value of `psp` meaning "parameter stack is empty".
pub const PSP_INIT: u32 = 0xffff_fffc;

/// A stack virtual machine: registers, page-backed memory, and the
/// termination slot. See `SPEC_FULL.md` §3 for the full invariant list.
#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    pub(crate) ip: u32,
    pub(crate) pbp: u32,
    pub(crate) psp: u32,
    pub(crate) pa: u32,
    pub(crate) cbp: u32,
    pub(crate) csp: u32,
    pub(crate) pages: PageTable,
    pub(crate) err: Option<Error>,
    pub(crate) err_ip: Option<u32>,
    pub(crate) decode_cache: DecodeCache,
}

impl Machine {
    pub(crate) fn new(pbp: u32, cbp: u32) -> Self {
        Machine {
            ip: 0,
            pbp,
            psp: PSP_INIT,
            pa: 0,
            cbp,
            csp: cbp,
            pages: PageTable::new(),
            err: None,
            err_ip: None,
            decode_cache: DecodeCache::new(),
        }
    }

    /// Current instruction pointer.
    pub fn ip(&self) -> u32 {
        self.ip
    }

    /// Parameter stack base.
    pub fn pbp(&self) -> u32 {
        self.pbp
    }

    /// Parameter stack pointer, or [`PSP_INIT`] if empty.
    pub fn psp(&self) -> u32 {
        self.psp
    }

    /// Control stack base.
    pub fn cbp(&self) -> u32 {
        self.cbp
    }

    /// Control stack pointer.
    pub fn csp(&self) -> u32 {
        self.csp
    }

    /// The termination cause, if the machine has stopped.
    pub fn err(&self) -> Option<Error> {
        self.err
    }

    /// True once the machine has stopped (successfully or not).
    pub fn is_halted(&self) -> bool {
        self.err.is_some()
    }

    /// Read-only access to the machine's memory, for hosts that want to
    /// inspect state outside the stack/result accessors.
    pub fn pages(&self) -> &PageTable {
        &self.pages
    }

    /// Mutable access to memory, for ops that bypass the stack discipline
    /// (`fetch`/`store`).
    pub(crate) fn pages_mut(&mut self) -> &mut PageTable {
        &mut self.pages
    }

    /// The termination error a host should see: `None` for a clean
    /// `halt(0)`, `Some` for everything else (including non-zero halts).
    pub fn result_err(&self) -> Option<Error> {
        self.err.filter(|e| !e.is_clean_halt())
    }

    /// `err`, annotated with the `ip` of the instruction that raised it, per
    /// `SPEC_FULL.md` §7.
    pub fn machine_error(&self) -> Option<MachineError> {
        self.err.map(|cause| MachineError {
            ip: self.err_ip.unwrap_or(self.ip),
            cause,
        })
    }

    /// As [`Machine::machine_error`], but `None` for a clean `halt(0)`,
    /// mirroring [`Machine::result_err`].
    pub fn result_machine_error(&self) -> Option<MachineError> {
        self.machine_error().filter(|e| !e.cause.is_clean_halt())
    }

    pub(crate) fn fail<T>(&self, err: Error) -> OpResult<T> {
        Err(err)
    }

    /// Records `err` as this machine's termination cause, tagged with the
    /// `ip` of the instruction that raised it. Called exactly once, by
    /// `ops::step`, after a decode or op-execution error.
    pub(crate) fn set_err(&mut self, ip: u32, err: Error) {
        self.err = Some(err);
        self.err_ip = Some(ip);
    }

    /// Decodes the op at the current `ip`, consulting the decode cache.
    pub(crate) fn decode_current(&mut self) -> OpResult<DecodedOp> {
        self.decode_cache.decode(&self.pages, self.ip)
    }

    /// Validates that `ip` is outside the stack region `[pbp, cbp]`. `cbp`
    /// itself is included: code must start strictly above it, never exactly
    /// on it (see `program::load`, which pads to the next page when the
    /// stack-size header already lands on one).
    pub(crate) fn check_ip(&self, ip: u32) -> OpResult<()> {
        if ip >= self.pbp && ip <= self.cbp {
            Err(Error::Segfault)
        } else {
            Ok(())
        }
    }

    /// Sets `ip` directly, after range-checking it.
    pub(crate) fn jump_to(&mut self, ip: u32) -> OpResult<()> {
        self.check_ip(ip)?;
        self.ip = ip;
        Ok(())
    }

    /// Adds a signed offset to the current `ip` and jumps there.
    pub(crate) fn jump_by(&mut self, offset: i32) -> OpResult<()> {
        let target = (self.ip as i32).wrapping_add(offset) as u32;
        self.jump_to(target)
    }

    /// Pushes `value` onto the parameter stack, spilling the cached head
    /// to memory first if the stack was non-empty. See `SPEC_FULL.md` §4.3.
    pub fn push(&mut self, value: u32) -> OpResult<()> {
        let new_psp = self.psp.wrapping_add(4);
        if new_psp != PSP_INIT {
            if new_psp > self.cbp {
                return self.fail(Error::StackUnderflow(StackKind::Param));
            }
            if new_psp > self.csp {
                return self.fail(Error::StackOverflow(StackKind::Param));
            }
        }
        if self.psp != PSP_INIT {
            self.pages.store_word(self.psp, self.pa)?;
        }
        self.pa = value;
        self.psp = new_psp;
        Ok(())
    }

    /// Pops and returns the top of the parameter stack.
    ///
    /// `psp == pbp` is the one-element state (the lone value lives in `pa`,
    /// nothing spilled below it); popping out of it empties the stack.
    /// Otherwise the new head was spilled to `psp - 4` by the push that
    /// cached its successor, so that is where it is restored from.
    pub fn pop(&mut self) -> OpResult<u32> {
        if self.psp == PSP_INIT {
            return self.fail(Error::StackUnderflow(StackKind::Param));
        }
        let value = self.pa;
        if self.psp == self.pbp {
            self.psp = PSP_INIT;
        } else {
            let new_psp = self.psp - 4;
            self.pa = self.pages.fetch_word(new_psp)?;
            self.psp = new_psp;
        }
        Ok(value)
    }

    /// Drops the top of the parameter stack, discarding the value.
    pub fn drop_top(&mut self) -> OpResult<()> {
        self.pop().map(|_| ())
    }

    /// Address of the `i`-th parameter from the top (1-indexed, `i >= 2`);
    /// memory holds every spilled value below the cached head `pa`, so the
    /// `i`-th one sits at `psp + 4 - i*4`.
    fn p_addr(&self, i: u32) -> OpResult<u32> {
        if self.psp == PSP_INIT {
            return Err(Error::StackUnderflow(StackKind::Param));
        }
        let addr = self.psp.wrapping_add(4).wrapping_sub(i * 4);
        if addr < self.pbp {
            return Err(Error::StackUnderflow(StackKind::Param));
        }
        Ok(addr)
    }

    /// Reads the `i`-th parameter from the top (1-indexed) without
    /// popping it.
    pub fn p_peek(&mut self, i: u32) -> OpResult<u32> {
        if i == 1 {
            if self.psp == PSP_INIT {
                return Err(Error::StackUnderflow(StackKind::Param));
            }
            return Ok(self.pa);
        }
        let addr = self.p_addr(i)?;
        self.pages.fetch_word(addr)
    }

    /// Writes the `i`-th parameter from the top (1-indexed) without
    /// changing stack depth.
    pub fn p_set(&mut self, i: u32, value: u32) -> OpResult<()> {
        if i == 1 {
            if self.psp == PSP_INIT {
                return Err(Error::StackUnderflow(StackKind::Param));
            }
            self.pa = value;
            return Ok(());
        }
        let addr = self.p_addr(i)?;
        self.pages.store_word(addr, value)
    }

    /// Applies `f` to the `i`-th parameter from the top in place.
    pub fn p_modify(&mut self, i: u32, f: impl FnOnce(u32) -> u32) -> OpResult<u32> {
        let old = self.p_peek(i)?;
        let new = f(old);
        self.p_set(i, new)?;
        Ok(new)
    }

    /// Pushes `value` onto the control stack, which grows downward from
    /// `cbp`.
    pub fn cpush(&mut self, value: u32) -> OpResult<()> {
        let new_csp = self.csp - 4;
        if new_csp < self.psp_ceiling() {
            return self.fail(Error::StackOverflow(StackKind::Control));
        }
        self.pages.store_word(new_csp, value)?;
        self.csp = new_csp;
        Ok(())
    }

    /// The highest address the control stack may grow down into without
    /// colliding with the parameter stack's current top.
    fn psp_ceiling(&self) -> u32 {
        if self.psp == PSP_INIT {
            self.pbp
        } else {
            self.psp
        }
    }

    /// Pops and returns the top of the control stack.
    pub fn cpop(&mut self) -> OpResult<u32> {
        if self.csp >= self.cbp {
            return self.fail(Error::StackUnderflow(StackKind::Control));
        }
        let value = self.pages.fetch_word(self.csp)?;
        self.csp += 4;
        Ok(value)
    }

    /// Reads the value at the top of the control stack without popping it.
    pub fn cpeek(&self) -> OpResult<u32> {
        if self.csp >= self.cbp {
            return Err(Error::StackUnderflow(StackKind::Control));
        }
        self.pages.fetch_word(self.csp)
    }

    /// Drops the top of the control stack without returning it.
    pub fn cdrop(&mut self) -> OpResult<()> {
        self.cpop().map(|_| ())
    }

    /// A snapshot of the parameter stack's contents, bottom to top.
    pub fn fetch_param_stack(&self) -> OpResult<Vec<u32>> {
        let mut values = Vec::new();
        let mut addr = self.pbp;
        while addr < self.psp.min(self.cbp) && self.psp != PSP_INIT {
            values.push(self.pages.fetch_word(addr)?);
            addr += 4;
        }
        if self.psp != PSP_INIT {
            values.push(self.pa);
        }
        Ok(values)
    }

    /// A snapshot of the control stack's contents, top to bottom (i.e. in
    /// the order a repeated `cpop` would observe them).
    pub fn fetch_control_stack(&self) -> OpResult<Vec<u32>> {
        let mut values = Vec::new();
        let mut addr = self.csp;
        while addr < self.cbp {
            values.push(self.pages.fetch_word(addr)?);
            addr += 4;
        }
        Ok(values)
    }

    /// A snapshot of both stacks: `(param, control)`, each in the order
    /// [`Machine::fetch_param_stack`]/[`Machine::fetch_control_stack`]
    /// document.
    pub fn stacks(&self) -> OpResult<(Vec<u32>, Vec<u32>)> {
        Ok((self.fetch_param_stack()?, self.fetch_control_stack()?))
    }

    /// Interprets the control stack, bottom to top (i.e. in the order a
    /// program's `cpush`es ran, oldest first), as `(from, to)` address-range
    /// pairs, and resolves each to the words stored in `[from, to)` — the
    /// convention a program uses to report its results before halting
    /// cleanly, per `SPEC_FULL.md` §6. Only meaningful once the machine
    /// has halted cleanly (`Error::Halt(0)`), mirroring the reference
    /// implementation's `Values`; an odd-length control stack, or a pair
    /// with `to < from` or not word-aligned, is malformed.
    pub fn values(&self) -> OpResult<Vec<Vec<u32>>> {
        if self.err != Some(Error::Halt(0)) {
            return Err(self.err.unwrap_or(Error::Segfault));
        }
        let mut raw = Vec::new();
        let mut addr = self.cbp;
        while addr > self.csp {
            addr -= 4;
            raw.push(self.pages.fetch_word(addr)?);
        }
        if raw.len() % 2 != 0 {
            return Err(Error::Segfault);
        }
        let mut out = Vec::with_capacity(raw.len() / 2);
        for pair in raw.chunks(2) {
            let (from, to) = (pair[0], pair[1]);
            if to < from || (to - from) % 4 != 0 {
                return Err(Error::Segfault);
            }
            let mut words = Vec::with_capacity(((to - from) / 4) as usize);
            let mut a = from;
            while a < to {
                words.push(self.pages.fetch_word(a)?);
                a += 4;
            }
            out.push(words);
        }
        Ok(out)
    }

    /// Runs a single instruction with no scheduler attached: any `fork` or
    /// `branch` fails immediately with [`Error::NoQueue`].
    pub fn step(&mut self) -> OpResult<()> {
        let mut sink = crate::context::NoQueue;
        crate::ops::step(self, &mut sink)
    }

    /// Runs [`Machine::step`] until the machine halts, returning its final
    /// error (`Error::Halt(0)` on a clean stop).
    pub fn run_to_halt(&mut self) -> Error {
        loop {
            if let Err(e) = self.step() {
                return e;
            }
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Machine")?;
        match self.err {
            Some(Error::Halt(code)) => write!(f, " HALT:{code}")?,
            Some(err) => write!(f, " ERR:{err}")?,
            None => {}
        }
        write!(
            f,
            " @0x{:08x} 0x{:08x}:0x{:08x} 0x{:08x}:0x{:08x}",
            self.ip, self.pbp, self.psp, self.cbp, self.csp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Machine {
        Machine::new(0, 0x40)
    }

    #[test]
    fn first_push_spills_nothing() {
        let mut m = fresh();
        m.push(7).unwrap();
        assert_eq!(m.pa, 7);
        assert_eq!(m.psp, PSP_INIT.wrapping_add(4));
        assert_eq!(m.pages.fetch_word(0).unwrap(), 0);
    }

    #[test]
    fn second_push_spills_head_to_memory() {
        let mut m = fresh();
        m.push(7).unwrap();
        m.push(9).unwrap();
        assert_eq!(m.pa, 9);
        assert_eq!(m.pages.fetch_word(0).unwrap(), 7);
    }

    #[test]
    fn pop_restores_cached_head() {
        let mut m = fresh();
        m.push(1).unwrap();
        m.push(2).unwrap();
        m.push(3).unwrap();
        assert_eq!(m.pop().unwrap(), 3);
        assert_eq!(m.pa, 2);
        assert_eq!(m.pop().unwrap(), 2);
        assert_eq!(m.pa, 1);
        assert_eq!(m.pop().unwrap(), 1);
        assert_eq!(m.psp, PSP_INIT);
    }

    #[test]
    fn pop_on_empty_stack_underflows() {
        let mut m = fresh();
        assert_eq!(m.pop(), Err(Error::StackUnderflow(StackKind::Param)));
    }

    #[test]
    fn control_and_param_stacks_collide() {
        let mut m = Machine::new(0, 8);
        m.push(1).unwrap();
        // csp starts at cbp=8; cpush would land at 4, which still leaves
        // room above psp (PSP_INIT, i.e. empty memory-backed region).
        m.cpush(99).unwrap();
        assert_eq!(m.csp, 4);
        // A second cpush would collide with pbp=0's ceiling once the
        // param stack has spilled into memory.
        m.push(2).unwrap();
        assert_eq!(
            m.cpush(1),
            Err(Error::StackOverflow(StackKind::Control))
        );
    }

    #[test]
    fn stack_round_trip_basic_scenario() {
        let mut m = fresh();
        m.push(2).unwrap();
        m.push(3).unwrap();
        let b = m.pop().unwrap();
        let a = m.p_peek(1).unwrap();
        m.p_set(1, a + b).unwrap();
        assert_eq!(m.p_peek(1).unwrap(), 5);
    }
}
