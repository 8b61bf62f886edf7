//! Instruction representation

use std::fmt;

use crate::cpu::RegisterFile;

pub mod decode_helper;

/// An instruction in flight.
/// Created at fetch, filled in by decode and execute,
/// dropped once it has been written back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instruction {
    /// Raw representation
    pub raw_inst: u32,
    /// Program counter at fetch
    pub pc: u32,
    /// Last stage this instruction completed
    pub stage: Stage,
    /// Opcode; `None` until decoded
    pub opcode: Option<Opcode>,
    /// Format; `None` until decoded
    pub format: Option<Format>,
    /// Subfields
    pub attributes: Attributes,
    /// Value of rs1 sampled at decode (or forwarded)
    pub rs1_value: u32,
    /// Value of rs2 sampled at decode (or forwarded)
    pub rs2_value: u32,
    /// Pending load or store, set by execute
    pub mem_op: Option<MemOp>,
    /// Pending register write, set by execute
    pub wb_op: Option<WriteBack>,
}

impl Instruction {
    /// Wraps a freshly fetched word
    pub fn fetched(raw_inst: u32, pc: u32) -> Self {
        Self {
            raw_inst,
            pc,
            stage: Stage::Fetch,
            opcode: None,
            format: None,
            attributes: Attributes::default(),
            rs1_value: 0,
            rs2_value: 0,
            mem_op: None,
            wb_op: None,
        }
    }

    /// Decodes the raw word and samples source registers from `gpr`.
    /// Returns `None` for an unsupported opcode.
    pub fn decode(&self, gpr: &RegisterFile) -> Option<Self> {
        decode_helper::decode(self.raw_inst, self.pc, gpr)
    }

    /// Branches and jumps redirect the program counter
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self.opcode,
            Some(Opcode::Branch | Opcode::Jal | Opcode::Jalr)
        )
    }

    pub fn is_load(&self) -> bool {
        self.opcode == Some(Opcode::Load)
    }

    /// Source registers this instruction actually reads.
    /// x0 is left out since it always reads zero.
    pub fn sources(&self) -> (Option<u32>, Option<u32>) {
        let nonzero = |r: Option<u32>| r.filter(|&r| r != 0);
        (nonzero(self.attributes.rs1), nonzero(self.attributes.rs2))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Some(opcode) => write!(
                f,
                "{:#010x}: {:?} ({:#010x})",
                self.pc, opcode, self.raw_inst
            ),
            None => write!(f, "{:#010x}: {:#010x}", self.pc, self.raw_inst),
        }
    }
}

/// Pipeline stages, in order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Fetch = 0,
    Decode = 1,
    Execute = 2,
    Memory = 3,
    WriteBack = 4,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Fetch,
        Stage::Decode,
        Stage::Execute,
        Stage::Memory,
        Stage::WriteBack,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// rv32i opcode
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Opcode {
    Lui,
    AuiPc,
    Jal,
    Jalr,
    Branch,
    Load,
    Store,
    Op,
    OpImm,
}

/// rv32i instruction format
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Format {
    R,
    I,
    S,
    B,
    U,
    J,
}

/// Instruction attributes.
/// `imm` holds the raw, unextended immediate field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Attributes {
    pub rs1: Option<u32>,
    pub rs2: Option<u32>,
    pub rd: Option<u32>,
    pub funct3: Option<u32>,
    pub funct7: Option<u32>,
    pub imm: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MemOpKind {
    Load,
    Store,
}

/// Pending memory operation.
/// For loads `mask` selects the bits kept from the word;
/// for stores it selects the bits of the old word that survive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemOp {
    pub kind: MemOpKind,
    pub address: u32,
    pub data: u32,
    pub mask: u32,
    pub signed: bool,
}

/// Pending register write
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WriteBack {
    pub dest: u32,
    pub data: u32,
}
