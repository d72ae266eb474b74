//! RV32 register ABI name table and architectural register file.

/// Register-width machine word.
pub type Word = u32;
/// Signed view of a machine word used by expression arithmetic.
pub type SWord = i32;

/// Number of architecturally visible general-purpose registers (`x0..x31`).
pub const GENERAL_REGISTER_COUNT: usize = 32;

/// ABI register names, ordered by register index.
pub const REGISTER_NAMES: [&str; GENERAL_REGISTER_COUNT] = [
    "$0", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4", "a5",
    "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4", "t5",
    "t6",
];

/// Index of the `a0` register, which carries the trap exit code.
pub const REG_A0: usize = 10;

/// Resolves an ABI register name to its index.
///
/// Names may carry a leading `$` (`$sp` and `sp` both resolve); `$0` is the
/// zero register's canonical spelling.
#[must_use]
pub fn register_index(name: &str) -> Option<usize> {
    REGISTER_NAMES
        .iter()
        .position(|candidate| *candidate == name)
        .or_else(|| {
            let bare = name.strip_prefix('$')?;
            REGISTER_NAMES.iter().position(|candidate| *candidate == bare)
        })
}

/// Returns the ABI name for a register index.
#[must_use]
pub fn register_name(index: usize) -> Option<&'static str> {
    REGISTER_NAMES.get(index).copied()
}

/// General-purpose registers plus the program counter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    gpr: [Word; GENERAL_REGISTER_COUNT],
    pc: Word,
}

impl RegisterFile {
    /// Creates a zeroed register file with `pc` at the given entry point.
    #[must_use]
    pub const fn with_pc(pc: Word) -> Self {
        Self {
            gpr: [0; GENERAL_REGISTER_COUNT],
            pc,
        }
    }

    /// Reads a general-purpose register; out-of-range indices read as `None`.
    #[must_use]
    pub fn gpr(&self, index: usize) -> Option<Word> {
        self.gpr.get(index).copied()
    }

    /// Writes a general-purpose register. Writes to `x0` and out-of-range
    /// indices are discarded.
    pub fn set_gpr(&mut self, index: usize, value: Word) {
        if index == 0 {
            return;
        }
        if let Some(slot) = self.gpr.get_mut(index) {
            *slot = value;
        }
    }

    /// Reads the `pc` register.
    #[must_use]
    pub const fn pc(&self) -> Word {
        self.pc
    }

    /// Writes the `pc` register.
    pub const fn set_pc(&mut self, value: Word) {
        self.pc = value;
    }
}
