//! Reference RV32I machine driven by the monitor through [`Target`].

/// RV32I instruction decoding.
pub mod decoder;
/// Instruction text rendering.
pub mod disasm;
/// Compute/commit execution pipeline.
pub mod execute;

pub use decoder::{decode, Instruction, EBREAK};
pub use execute::{commit_execution, execute_instruction, ExecuteState};

use tracing::{info, trace, warn};

use crate::memory::{PhysicalMemory, WORD_ACCESS_BYTES};
use crate::registers::{RegisterFile, REG_A0};
use crate::{ExecFault, MachineConfig, MemoryFault, RunState, StepOutcome, Target, Word};

/// Single-hart RV32I machine with flat physical memory.
#[derive(Debug, Clone)]
pub struct Machine {
    regs: RegisterFile,
    memory: PhysicalMemory,
    state: RunState,
}

impl Machine {
    /// Creates a machine with zeroed memory and `pc` at `mem_base`.
    #[must_use]
    pub fn new(config: &MachineConfig) -> Self {
        Self {
            regs: RegisterFile::with_pc(config.mem_base),
            memory: PhysicalMemory::new(config.mem_base, config.mem_size),
            state: RunState::default(),
        }
    }

    /// Copies a raw program image to the start of memory.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::ImageTooLarge`] when the image does not fit.
    pub fn load_image(&mut self, image: &[u8]) -> Result<(), MemoryFault> {
        self.memory.load(image)
    }

    /// Architectural register file.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Mutable architectural register file.
    pub const fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Physical memory.
    #[must_use]
    pub const fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    /// Mutable physical memory.
    pub const fn memory_mut(&mut self) -> &mut PhysicalMemory {
        &mut self.memory
    }

    fn try_step(&mut self, pc: Word) -> Result<(u32, bool), ExecFault> {
        let raw = self.memory.read(pc, WORD_ACCESS_BYTES)?;
        let instruction = decode(raw)?;
        trace!("{pc:#010x}: {instruction}");
        let exec = execute_instruction(&instruction, pc, &self.regs, &self.memory)?;
        commit_execution(&exec, &mut self.regs, &mut self.memory)?;
        Ok((raw, exec.trap))
    }
}

impl Target for Machine {
    fn register(&self, index: usize) -> Option<Word> {
        self.regs.gpr(index)
    }

    fn pc(&self) -> Word {
        self.regs.pc()
    }

    fn read_memory(&self, addr: Word, width: usize) -> Result<Word, MemoryFault> {
        self.memory.read(addr, width)
    }

    fn step(&mut self) -> StepOutcome {
        let pc = self.regs.pc();
        match self.try_step(pc) {
            Ok((raw, false)) => StepOutcome::Retired { pc, raw },
            Ok((_, true)) => {
                let code = self.regs.gpr(REG_A0).unwrap_or(0);
                info!("trap at pc = {pc:#010x}, a0 = {code}");
                self.state = RunState::End { pc, code };
                StepOutcome::Trapped { pc, code }
            }
            Err(cause) => {
                warn!("abort at pc = {pc:#010x}: {cause}");
                self.state = RunState::Abort { pc };
                StepOutcome::Fault { pc, cause }
            }
        }
    }

    fn run_state(&self) -> RunState {
        self.state
    }

    fn set_run_state(&mut self, state: RunState) {
        self.state = state;
    }

    fn describe(&self, pc: Word, raw: u32) -> String {
        decode(raw).map_or_else(
            |_| format!("{pc:#010x}: {raw:08x}"),
            |instruction| format!("{pc:#010x}: {raw:08x}  {instruction}"),
        )
    }
}
