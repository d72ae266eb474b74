//! RV32I instruction decoder for the reference machine.
//!
//! Only the base integer subset the monitor needs to drive real programs is
//! accepted; everything else decodes to [`ExecFault::IllegalInstruction`].

#![allow(
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]

use crate::ExecFault;

const OPCODE_LUI: u32 = 0x37;
const OPCODE_AUIPC: u32 = 0x17;
const OPCODE_JAL: u32 = 0x6F;
const OPCODE_JALR: u32 = 0x67;
const OPCODE_BRANCH: u32 = 0x63;
const OPCODE_LOAD: u32 = 0x03;
const OPCODE_STORE: u32 = 0x23;
const OPCODE_OP_IMM: u32 = 0x13;
const OPCODE_OP: u32 = 0x33;

/// Raw encoding of `ebreak`, used as the program-exit trap.
pub const EBREAK: u32 = 0x0010_0073;

/// Register-register and register-immediate ALU operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum AluOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
}

impl AluOp {
    /// Assembly mnemonic for the register-register form.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Sll => "sll",
            Self::Slt => "slt",
            Self::Sltu => "sltu",
            Self::Xor => "xor",
            Self::Srl => "srl",
            Self::Sra => "sra",
            Self::Or => "or",
            Self::And => "and",
        }
    }
}

/// Conditional branch comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BranchCond {
    Eq,
    Ne,
    Lt,
    Ge,
    Ltu,
    Geu,
}

impl BranchCond {
    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Eq => "beq",
            Self::Ne => "bne",
            Self::Lt => "blt",
            Self::Ge => "bge",
            Self::Ltu => "bltu",
            Self::Geu => "bgeu",
        }
    }
}

/// Load widths with their extension behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum LoadKind {
    Byte,
    Half,
    Word,
    ByteUnsigned,
    HalfUnsigned,
}

impl LoadKind {
    /// Access width in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Byte | Self::ByteUnsigned => 1,
            Self::Half | Self::HalfUnsigned => 2,
            Self::Word => 4,
        }
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Byte => "lb",
            Self::Half => "lh",
            Self::Word => "lw",
            Self::ByteUnsigned => "lbu",
            Self::HalfUnsigned => "lhu",
        }
    }
}

/// Store widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StoreKind {
    Byte,
    Half,
    Word,
}

impl StoreKind {
    /// Access width in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
        }
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Byte => "sb",
            Self::Half => "sh",
            Self::Word => "sw",
        }
    }
}

/// Decoded instruction with register fields as indices (`0..32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Instruction {
    Lui {
        rd: u8,
        imm: u32,
    },
    Auipc {
        rd: u8,
        imm: u32,
    },
    Jal {
        rd: u8,
        offset: i32,
    },
    Jalr {
        rd: u8,
        rs1: u8,
        offset: i32,
    },
    Branch {
        cond: BranchCond,
        rs1: u8,
        rs2: u8,
        offset: i32,
    },
    Load {
        kind: LoadKind,
        rd: u8,
        rs1: u8,
        offset: i32,
    },
    Store {
        kind: StoreKind,
        rs1: u8,
        rs2: u8,
        offset: i32,
    },
    OpImm {
        op: AluOp,
        rd: u8,
        rs1: u8,
        imm: i32,
    },
    Op {
        op: AluOp,
        rd: u8,
        rs1: u8,
        rs2: u8,
    },
    Ebreak,
}

const fn rd(raw: u32) -> u8 {
    ((raw >> 7) & 0x1F) as u8
}

const fn rs1(raw: u32) -> u8 {
    ((raw >> 15) & 0x1F) as u8
}

const fn rs2(raw: u32) -> u8 {
    ((raw >> 20) & 0x1F) as u8
}

const fn funct3(raw: u32) -> u32 {
    (raw >> 12) & 0x7
}

const fn funct7(raw: u32) -> u32 {
    raw >> 25
}

const fn imm_i(raw: u32) -> i32 {
    (raw as i32) >> 20
}

const fn imm_s(raw: u32) -> i32 {
    (((raw as i32) >> 25) << 5) | ((raw >> 7) & 0x1F) as i32
}

const fn imm_b(raw: u32) -> i32 {
    (((raw as i32) >> 31) << 12)
        | (((raw >> 7) & 0x1) << 11) as i32
        | (((raw >> 25) & 0x3F) << 5) as i32
        | (((raw >> 8) & 0xF) << 1) as i32
}

const fn imm_u(raw: u32) -> u32 {
    raw & 0xFFFF_F000
}

const fn imm_j(raw: u32) -> i32 {
    (((raw as i32) >> 31) << 20)
        | (((raw >> 12) & 0xFF) << 12) as i32
        | (((raw >> 20) & 0x1) << 11) as i32
        | (((raw >> 21) & 0x3FF) << 1) as i32
}

/// Decodes a raw 32-bit instruction word.
///
/// # Errors
///
/// Returns [`ExecFault::IllegalInstruction`] for encodings outside the
/// supported RV32I subset.
pub const fn decode(raw: u32) -> Result<Instruction, ExecFault> {
    let illegal = ExecFault::IllegalInstruction { raw };
    let instruction = match raw & 0x7F {
        OPCODE_LUI => Instruction::Lui {
            rd: rd(raw),
            imm: imm_u(raw),
        },
        OPCODE_AUIPC => Instruction::Auipc {
            rd: rd(raw),
            imm: imm_u(raw),
        },
        OPCODE_JAL => Instruction::Jal {
            rd: rd(raw),
            offset: imm_j(raw),
        },
        OPCODE_JALR if funct3(raw) == 0 => Instruction::Jalr {
            rd: rd(raw),
            rs1: rs1(raw),
            offset: imm_i(raw),
        },
        OPCODE_BRANCH => {
            let cond = match funct3(raw) {
                0 => BranchCond::Eq,
                1 => BranchCond::Ne,
                4 => BranchCond::Lt,
                5 => BranchCond::Ge,
                6 => BranchCond::Ltu,
                7 => BranchCond::Geu,
                _ => return Err(illegal),
            };
            Instruction::Branch {
                cond,
                rs1: rs1(raw),
                rs2: rs2(raw),
                offset: imm_b(raw),
            }
        }
        OPCODE_LOAD => {
            let kind = match funct3(raw) {
                0 => LoadKind::Byte,
                1 => LoadKind::Half,
                2 => LoadKind::Word,
                4 => LoadKind::ByteUnsigned,
                5 => LoadKind::HalfUnsigned,
                _ => return Err(illegal),
            };
            Instruction::Load {
                kind,
                rd: rd(raw),
                rs1: rs1(raw),
                offset: imm_i(raw),
            }
        }
        OPCODE_STORE => {
            let kind = match funct3(raw) {
                0 => StoreKind::Byte,
                1 => StoreKind::Half,
                2 => StoreKind::Word,
                _ => return Err(illegal),
            };
            Instruction::Store {
                kind,
                rs1: rs1(raw),
                rs2: rs2(raw),
                offset: imm_s(raw),
            }
        }
        OPCODE_OP_IMM => {
            let shamt = rs2(raw) as i32;
            let (op, imm) = match (funct3(raw), funct7(raw)) {
                (0, _) => (AluOp::Add, imm_i(raw)),
                (2, _) => (AluOp::Slt, imm_i(raw)),
                (3, _) => (AluOp::Sltu, imm_i(raw)),
                (4, _) => (AluOp::Xor, imm_i(raw)),
                (6, _) => (AluOp::Or, imm_i(raw)),
                (7, _) => (AluOp::And, imm_i(raw)),
                (1, 0x00) => (AluOp::Sll, shamt),
                (5, 0x00) => (AluOp::Srl, shamt),
                (5, 0x20) => (AluOp::Sra, shamt),
                _ => return Err(illegal),
            };
            Instruction::OpImm {
                op,
                rd: rd(raw),
                rs1: rs1(raw),
                imm,
            }
        }
        OPCODE_OP => {
            let op = match (funct3(raw), funct7(raw)) {
                (0, 0x00) => AluOp::Add,
                (0, 0x20) => AluOp::Sub,
                (1, 0x00) => AluOp::Sll,
                (2, 0x00) => AluOp::Slt,
                (3, 0x00) => AluOp::Sltu,
                (4, 0x00) => AluOp::Xor,
                (5, 0x00) => AluOp::Srl,
                (5, 0x20) => AluOp::Sra,
                (6, 0x00) => AluOp::Or,
                (7, 0x00) => AluOp::And,
                _ => return Err(illegal),
            };
            Instruction::Op {
                op,
                rd: rd(raw),
                rs1: rs1(raw),
                rs2: rs2(raw),
            }
        }
        _ if raw == EBREAK => Instruction::Ebreak,
        _ => return Err(illegal),
    };
    Ok(instruction)
}
