//! Instruction execution for the reference machine.
//!
//! Execution is split into a side-effect-free compute phase that produces an
//! [`ExecuteState`] and a commit phase that applies it. The only fallible
//! commit step (the store) runs first, so a faulting instruction leaves no
//! partial register or `pc` update behind.

#![allow(
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]

use super::decoder::{AluOp, BranchCond, Instruction, LoadKind};
use crate::memory::PhysicalMemory;
use crate::registers::RegisterFile;
use crate::{ExecFault, Word};

/// Memory write produced by a store instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingStore {
    /// Effective address.
    pub addr: Word,
    /// Width in bytes.
    pub width: usize,
    /// Value whose low `width` bytes are written.
    pub value: Word,
}

/// Side effects accumulated while executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteState {
    /// Destination register index and value.
    pub dest: Option<(usize, Word)>,
    /// Memory write to perform.
    pub store: Option<PendingStore>,
    /// `pc` after the instruction.
    pub next_pc: Word,
    /// Instruction was the exit trap.
    pub trap: bool,
}

impl ExecuteState {
    const fn fallthrough(pc: Word) -> Self {
        Self {
            dest: None,
            store: None,
            next_pc: pc.wrapping_add(4),
            trap: false,
        }
    }
}

fn reg(regs: &RegisterFile, index: u8) -> Word {
    regs.gpr(usize::from(index)).unwrap_or(0)
}

const fn alu(op: AluOp, a: Word, b: Word) -> Word {
    let shamt = b & 0x1F;
    match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Sll => a << shamt,
        AluOp::Slt => ((a as i32) < (b as i32)) as Word,
        AluOp::Sltu => (a < b) as Word,
        AluOp::Xor => a ^ b,
        AluOp::Srl => a >> shamt,
        AluOp::Sra => ((a as i32) >> shamt) as Word,
        AluOp::Or => a | b,
        AluOp::And => a & b,
    }
}

const fn branch_taken(cond: BranchCond, a: Word, b: Word) -> bool {
    match cond {
        BranchCond::Eq => a == b,
        BranchCond::Ne => a != b,
        BranchCond::Lt => (a as i32) < (b as i32),
        BranchCond::Ge => (a as i32) >= (b as i32),
        BranchCond::Ltu => a < b,
        BranchCond::Geu => a >= b,
    }
}

const fn extend_load(kind: LoadKind, raw: Word) -> Word {
    match kind {
        LoadKind::Byte => raw as u8 as i8 as i32 as Word,
        LoadKind::Half => raw as u16 as i16 as i32 as Word,
        LoadKind::Word | LoadKind::ByteUnsigned | LoadKind::HalfUnsigned => raw,
    }
}

/// Computes the side effects of `instr` fetched from `pc`.
///
/// Loads read memory here; stores are deferred to [`commit_execution`].
///
/// # Errors
///
/// Returns [`ExecFault::Memory`] when a load touches invalid memory.
pub fn execute_instruction(
    instr: &Instruction,
    pc: Word,
    regs: &RegisterFile,
    memory: &PhysicalMemory,
) -> Result<ExecuteState, ExecFault> {
    let mut exec = ExecuteState::fallthrough(pc);

    match *instr {
        Instruction::Lui { rd, imm } => exec.dest = Some((usize::from(rd), imm)),
        Instruction::Auipc { rd, imm } => {
            exec.dest = Some((usize::from(rd), pc.wrapping_add(imm)));
        }
        Instruction::Jal { rd, offset } => {
            exec.dest = Some((usize::from(rd), exec.next_pc));
            exec.next_pc = pc.wrapping_add(offset as Word);
        }
        Instruction::Jalr { rd, rs1, offset } => {
            let target = reg(regs, rs1).wrapping_add(offset as Word) & !1;
            exec.dest = Some((usize::from(rd), exec.next_pc));
            exec.next_pc = target;
        }
        Instruction::Branch {
            cond,
            rs1,
            rs2,
            offset,
        } => {
            if branch_taken(cond, reg(regs, rs1), reg(regs, rs2)) {
                exec.next_pc = pc.wrapping_add(offset as Word);
            }
        }
        Instruction::Load {
            kind,
            rd,
            rs1,
            offset,
        } => {
            let addr = reg(regs, rs1).wrapping_add(offset as Word);
            let raw = memory.read(addr, kind.width())?;
            exec.dest = Some((usize::from(rd), extend_load(kind, raw)));
        }
        Instruction::Store {
            kind,
            rs1,
            rs2,
            offset,
        } => {
            exec.store = Some(PendingStore {
                addr: reg(regs, rs1).wrapping_add(offset as Word),
                width: kind.width(),
                value: reg(regs, rs2),
            });
        }
        Instruction::OpImm { op, rd, rs1, imm } => {
            exec.dest = Some((usize::from(rd), alu(op, reg(regs, rs1), imm as Word)));
        }
        Instruction::Op { op, rd, rs1, rs2 } => {
            exec.dest = Some((usize::from(rd), alu(op, reg(regs, rs1), reg(regs, rs2))));
        }
        Instruction::Ebreak => exec.trap = true,
    }

    Ok(exec)
}

/// Applies the side effects computed by [`execute_instruction`].
///
/// # Errors
///
/// Returns [`ExecFault::Memory`] when the pending store is out of range; no
/// register or `pc` update happens in that case.
pub fn commit_execution(
    exec: &ExecuteState,
    regs: &mut RegisterFile,
    memory: &mut PhysicalMemory,
) -> Result<(), ExecFault> {
    if let Some(store) = exec.store {
        memory.write(store.addr, store.width, store.value)?;
    }
    if let Some((index, value)) = exec.dest {
        regs.set_gpr(index, value);
    }
    regs.set_pc(exec.next_pc);
    Ok(())
}
