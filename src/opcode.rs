//! The `opcode` module defines the 128-slot op table: which opcodes exist,
//! their names, and what kind of immediate (if any) they take.

use bitflags::bitflags;

bitflags! {
    /// Packed immediate-kind metadata for one opcode slot.
    ///
    /// Mirrors the reference implementation's packed `opImmKind`, which
    /// stores a 4-bit kind plus a "required" flag in the same byte; here the
    /// kind bits and the `REQUIRED` flag are simply disjoint bitflags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ImmKind: u8 {
        /// The op takes a numeric value immediate (e.g. `push`).
        const VALUE    = 0b0001;
        /// The op takes an absolute address immediate (e.g. `call`).
        const ADDRESS  = 0b0010;
        /// The op takes an IP-relative offset immediate (e.g. `jump`).
        const OFFSET   = 0b0100;
        /// The immediate is mandatory; omitting it is a decode error.
        const REQUIRED = 0b1000;
    }
}

impl ImmKind {
    const TYPE_MASK: ImmKind = ImmKind::VALUE.union(ImmKind::ADDRESS).union(ImmKind::OFFSET);

    /// True if this op takes no immediate at all.
    pub fn is_none(self) -> bool {
        !self.intersects(Self::TYPE_MASK)
    }

    /// True if the immediate must be present.
    pub fn is_required(self) -> bool {
        self.contains(Self::REQUIRED)
    }
}

/// Static metadata for one opcode slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpDef {
    /// Mnemonic, used by tracers and by the crate's own test assembler.
    pub name: &'static str,
    /// What kind of immediate this op accepts.
    pub imm: ImmKind,
}

const fn def(name: &'static str, imm: ImmKind) -> OpDef {
    OpDef { name, imm }
}

const NONE: ImmKind = ImmKind::empty();
const EMPTY: OpDef = OpDef { name: "", imm: NONE };

/// Numeric opcode values. Implementations may renumber freely as long as
/// the table below and the bytecode layer stay internally consistent.
pub mod code {
    pub const PUSH: u8 = 0x00;
    pub const POP: u8 = 0x01;
    pub const DUP: u8 = 0x02;
    pub const SWAP: u8 = 0x03;
    pub const FETCH: u8 = 0x08;
    pub const STORE: u8 = 0x09;
    pub const STORE_TO: u8 = 0x0a;
    pub const ADD: u8 = 0x10;
    pub const SUB: u8 = 0x11;
    pub const MUL: u8 = 0x12;
    pub const DIV: u8 = 0x13;
    pub const MOD: u8 = 0x14;
    pub const DIVMOD: u8 = 0x15;
    pub const NEG: u8 = 0x16;
    pub const LT: u8 = 0x18;
    pub const LTE: u8 = 0x19;
    pub const GT: u8 = 0x1a;
    pub const GTE: u8 = 0x1b;
    pub const EQ: u8 = 0x1c;
    pub const NEQ: u8 = 0x1d;
    pub const NOT: u8 = 0x20;
    pub const AND: u8 = 0x21;
    pub const OR: u8 = 0x22;
    pub const CPUSH: u8 = 0x28;
    pub const CPOP: u8 = 0x29;
    pub const P2C: u8 = 0x2a;
    pub const C2P: u8 = 0x2b;
    pub const MARK: u8 = 0x2c;
    pub const JUMP: u8 = 0x30;
    pub const JNZ: u8 = 0x31;
    pub const JZ: u8 = 0x32;
    pub const LOOP: u8 = 0x33;
    pub const LNZ: u8 = 0x34;
    pub const LZ: u8 = 0x35;
    pub const CALL: u8 = 0x36;
    pub const RET: u8 = 0x37;
    pub const FORK: u8 = 0x40;
    pub const FNZ: u8 = 0x41;
    pub const FZ: u8 = 0x42;
    pub const BRANCH: u8 = 0x50;
    pub const BNZ: u8 = 0x51;
    pub const BZ: u8 = 0x52;
    pub const HNZ: u8 = 0x7d;
    pub const HZ: u8 = 0x7e;
    pub const HALT: u8 = 0x7f;
}

/// The 128-slot dispatch table; empty slots decode to [`crate::Error::InvalidOp`].
pub static OPS: [OpDef; 128] = build_table();

const fn build_table() -> [OpDef; 128] {
    let mut table = [EMPTY; 128];

    table[code::PUSH as usize] = def("push", ImmKind::VALUE.union(ImmKind::REQUIRED));
    table[code::POP as usize] = def("pop", ImmKind::VALUE);
    table[code::DUP as usize] = def("dup", ImmKind::VALUE);
    table[code::SWAP as usize] = def("swap", ImmKind::VALUE);

    table[code::FETCH as usize] = def("fetch", ImmKind::ADDRESS);
    table[code::STORE as usize] = def("store", NONE);
    table[code::STORE_TO as usize] = def("storeTo", ImmKind::ADDRESS.union(ImmKind::REQUIRED));

    table[code::ADD as usize] = def("add", ImmKind::VALUE);
    table[code::SUB as usize] = def("sub", ImmKind::VALUE);
    table[code::MUL as usize] = def("mul", ImmKind::VALUE);
    table[code::DIV as usize] = def("div", ImmKind::VALUE);
    table[code::MOD as usize] = def("mod", ImmKind::VALUE);
    table[code::DIVMOD as usize] = def("divmod", ImmKind::VALUE);
    table[code::NEG as usize] = def("neg", NONE);

    table[code::LT as usize] = def("lt", ImmKind::VALUE);
    table[code::LTE as usize] = def("lte", ImmKind::VALUE);
    table[code::GT as usize] = def("gt", ImmKind::VALUE);
    table[code::GTE as usize] = def("gte", ImmKind::VALUE);
    table[code::EQ as usize] = def("eq", ImmKind::VALUE);
    table[code::NEQ as usize] = def("neq", ImmKind::VALUE);

    table[code::NOT as usize] = def("not", NONE);
    table[code::AND as usize] = def("and", NONE);
    table[code::OR as usize] = def("or", NONE);

    table[code::CPUSH as usize] = def("cpush", ImmKind::VALUE.union(ImmKind::REQUIRED));
    table[code::CPOP as usize] = def("cpop", ImmKind::VALUE);
    table[code::P2C as usize] = def("p2c", ImmKind::VALUE);
    table[code::C2P as usize] = def("c2p", ImmKind::VALUE);
    table[code::MARK as usize] = def("mark", NONE);

    table[code::JUMP as usize] = def("jump", ImmKind::OFFSET);
    table[code::JNZ as usize] = def("jnz", ImmKind::OFFSET);
    table[code::JZ as usize] = def("jz", ImmKind::OFFSET);
    table[code::LOOP as usize] = def("loop", NONE);
    table[code::LNZ as usize] = def("lnz", NONE);
    table[code::LZ as usize] = def("lz", NONE);
    table[code::CALL as usize] = def("call", ImmKind::ADDRESS);
    table[code::RET as usize] = def("ret", NONE);

    table[code::FORK as usize] = def("fork", ImmKind::OFFSET);
    table[code::FNZ as usize] = def("fnz", ImmKind::OFFSET);
    table[code::FZ as usize] = def("fz", ImmKind::OFFSET);

    table[code::BRANCH as usize] = def("branch", ImmKind::OFFSET);
    table[code::BNZ as usize] = def("bnz", ImmKind::OFFSET);
    table[code::BZ as usize] = def("bz", ImmKind::OFFSET);

    table[code::HNZ as usize] = def("hnz", ImmKind::VALUE.union(ImmKind::REQUIRED));
    table[code::HZ as usize] = def("hz", ImmKind::VALUE.union(ImmKind::REQUIRED));
    table[code::HALT as usize] = def("halt", ImmKind::VALUE.union(ImmKind::REQUIRED));

    table
}

/// Looks up an opcode's definition by name, for use by the crate's own
/// test assembler (the full textual assembler is out of scope for this
/// crate; see `SPEC_FULL.md` §1).
pub fn lookup_by_name(name: &str) -> Option<(u8, OpDef)> {
    OPS.iter()
        .enumerate()
        .find(|(_, d)| d.name == name)
        .map(|(code, d)| (code as u8, *d))
}
