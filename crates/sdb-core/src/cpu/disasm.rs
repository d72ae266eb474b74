//! Instruction disassembly for the execution trace.

use std::fmt;

use super::decoder::{AluOp, Instruction};
use crate::registers::register_name;

struct Reg(u8);

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => f.write_str("zero"),
            n => f.write_str(register_name(usize::from(n)).unwrap_or("?")),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Lui { rd, imm } => write!(f, "lui {}, {:#x}", Reg(rd), imm >> 12),
            Self::Auipc { rd, imm } => write!(f, "auipc {}, {:#x}", Reg(rd), imm >> 12),
            Self::Jal { rd, offset } => write!(f, "jal {}, {offset}", Reg(rd)),
            Self::Jalr { rd, rs1, offset } => {
                write!(f, "jalr {}, {offset}({})", Reg(rd), Reg(rs1))
            }
            Self::Branch {
                cond,
                rs1,
                rs2,
                offset,
            } => write!(f, "{} {}, {}, {offset}", cond.mnemonic(), Reg(rs1), Reg(rs2)),
            Self::Load {
                kind,
                rd,
                rs1,
                offset,
            } => write!(f, "{} {}, {offset}({})", kind.mnemonic(), Reg(rd), Reg(rs1)),
            Self::Store {
                kind,
                rs1,
                rs2,
                offset,
            } => write!(f, "{} {}, {offset}({})", kind.mnemonic(), Reg(rs2), Reg(rs1)),
            Self::OpImm { op, rd, rs1, imm } => {
                let mnemonic = match op {
                    AluOp::Add => "addi",
                    AluOp::Slt => "slti",
                    AluOp::Sltu => "sltiu",
                    AluOp::Xor => "xori",
                    AluOp::Or => "ori",
                    AluOp::And => "andi",
                    AluOp::Sll => "slli",
                    AluOp::Srl => "srli",
                    AluOp::Sra => "srai",
                    AluOp::Sub => "subi",
                };
                write!(f, "{mnemonic} {}, {}, {imm}", Reg(rd), Reg(rs1))
            }
            Self::Op { op, rd, rs1, rs2 } => write!(
                f,
                "{} {}, {}, {}",
                op.mnemonic(),
                Reg(rd),
                Reg(rs1),
                Reg(rs2)
            ),
            Self::Ebreak => f.write_str("ebreak"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cpu::decoder::decode;

    fn disasm(raw: u32) -> String {
        decode(raw).expect("valid encoding").to_string()
    }

    #[test]
    fn builtin_image_disassembles() {
        assert_eq!(disasm(0x0000_0297), "auipc t0, 0x0");
        assert_eq!(disasm(0x0002_8823), "sb zero, 16(t0)");
        assert_eq!(disasm(0x0102_C503), "lbu a0, 16(t0)");
        assert_eq!(disasm(0x0010_0073), "ebreak");
    }

    #[test]
    fn immediates_print_signed() {
        assert_eq!(disasm(0xFFF5_0513), "addi a0, a0, -1");
        assert_eq!(disasm(0xFE05_1EE3), "bne a0, zero, -4");
        assert_eq!(disasm(0x40C5_8533), "sub a0, a1, a2");
    }
}
