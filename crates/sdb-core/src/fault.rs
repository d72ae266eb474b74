use thiserror::Error;

use crate::Word;

/// Physical-memory access violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryFault {
    /// Access touched bytes outside the physical memory window.
    #[error("address {addr:#010x} (width {width}) is out of bound of physical memory")]
    OutOfBounds {
        /// First byte of the attempted access.
        addr: Word,
        /// Access width in bytes.
        width: usize,
    },
    /// Access width is not 1, 2, or 4 bytes.
    #[error("unsupported access width {0}")]
    UnsupportedWidth(usize),
    /// A program image does not fit in physical memory.
    #[error("image of {len} bytes does not fit in {capacity} bytes of physical memory")]
    ImageTooLarge {
        /// Image length in bytes.
        len: usize,
        /// Physical memory size in bytes.
        capacity: usize,
    },
}

/// Faults that abort instruction execution on the reference machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExecFault {
    /// Fetched word is not a supported RV32I encoding.
    #[error("invalid instruction {raw:#010x}")]
    IllegalInstruction {
        /// Raw instruction word.
        raw: u32,
    },
    /// Fetch, load, or store touched invalid memory.
    #[error(transparent)]
    Memory(#[from] MemoryFault),
}
