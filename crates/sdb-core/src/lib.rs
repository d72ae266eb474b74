//! Core crate for the SDB monitor: expression engine, watchpoint pool, and
//! the reference RV32I target the monitor drives.

/// Register ABI name table and architectural register file.
pub mod registers;
pub use registers::{
    register_index, register_name, RegisterFile, SWord, Word, GENERAL_REGISTER_COUNT,
    REGISTER_NAMES, REG_A0,
};

/// Fault taxonomy for memory accesses and instruction execution.
pub mod fault;
pub use fault::{ExecFault, MemoryFault};

/// Flat physical memory and access validation.
pub mod memory;
pub use memory::{PhysicalMemory, DEFAULT_MEMORY_SIZE, MEMORY_BASE, WORD_ACCESS_BYTES};

/// Host-facing contract between the monitor and a simulated machine.
pub mod api;
pub use api::{MachineConfig, RunState, StepOutcome, Target};

/// Reference RV32I machine.
pub mod cpu;
pub use cpu::{Instruction, Machine};

/// Expression tokenizer and evaluator.
pub mod expr;
pub use expr::{ExprEngine, ExprError, RuleError, Token, TokenKind, MAX_NESTING};

/// Fixed-capacity watchpoint pool.
pub mod watchpoint;
pub use watchpoint::{WatchId, WatchPool, WatchRecord, WATCHPOINT_POOL_SIZE};

#[cfg(test)]
use proptest as _;
