//! Host-facing contracts between the monitor and the simulated machine.
//!
//! The monitor never reaches into a concrete CPU. It reads registers and
//! memory, steps one instruction at a time, and observes the halt state
//! through [`Target`].

use crate::memory::{DEFAULT_MEMORY_SIZE, MEMORY_BASE};
use crate::{ExecFault, MemoryFault, Word};

/// Top-level immutable configuration for a machine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineConfig {
    /// Guest physical address of the first memory byte and the reset `pc`.
    pub mem_base: Word,
    /// Physical memory size in bytes.
    pub mem_size: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            mem_base: MEMORY_BASE,
            mem_size: DEFAULT_MEMORY_SIZE,
        }
    }
}

/// Simulator execution state observed by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Instructions are being executed.
    Running,
    /// Paused, waiting for a monitor command.
    #[default]
    Stop,
    /// Program hit its trap instruction.
    End {
        /// Address of the trap instruction.
        pc: Word,
        /// Exit code carried in `a0`.
        code: Word,
    },
    /// Execution aborted on a fault.
    Abort {
        /// Address of the faulting instruction.
        pc: Word,
    },
    /// Operator asked the monitor to quit.
    Quit,
}

impl RunState {
    /// Returns `true` once the program can make no further progress.
    #[must_use]
    pub const fn has_ended(self) -> bool {
        matches!(self, Self::End { .. } | Self::Abort { .. } | Self::Quit)
    }

    /// Process-level verdict: quitting, or ending with exit code zero.
    #[must_use]
    pub const fn is_good_exit(self) -> bool {
        matches!(self, Self::Quit | Self::End { code: 0, .. })
    }
}

/// Output status from one instruction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// Instruction retired normally.
    Retired {
        /// Address the instruction was fetched from.
        pc: Word,
        /// Raw instruction word.
        raw: u32,
    },
    /// Trap instruction retired; the program has ended.
    Trapped {
        /// Address of the trap instruction.
        pc: Word,
        /// Exit code carried in `a0`.
        code: Word,
    },
    /// Fetch, decode, or execute faulted; the program is aborted.
    Fault {
        /// Address of the faulting instruction.
        pc: Word,
        /// Fault raised by the machine.
        cause: ExecFault,
    },
}

/// Machine interface consumed by the expression engine and the monitor.
pub trait Target {
    /// Reads general-purpose register `index`; `None` for invalid indices.
    fn register(&self, index: usize) -> Option<Word>;

    /// Reads the program counter.
    fn pc(&self) -> Word;

    /// Reads `width` bytes of guest memory as a zero-extended word.
    ///
    /// # Errors
    ///
    /// Returns a [`MemoryFault`] when the access is out of range or uses an
    /// unsupported width.
    fn read_memory(&self, addr: Word, width: usize) -> Result<Word, MemoryFault>;

    /// Executes exactly one instruction and updates the run state on trap or
    /// fault.
    fn step(&mut self) -> StepOutcome;

    /// Current simulator state.
    fn run_state(&self) -> RunState;

    /// Overrides the simulator state (used for `Running`, `Stop`, and `Quit`).
    fn set_run_state(&mut self, state: RunState);

    /// Renders an instruction for the execution trace.
    fn describe(&self, pc: Word, raw: u32) -> String {
        format!("{pc:#010x}: {raw:08x}")
    }
}
