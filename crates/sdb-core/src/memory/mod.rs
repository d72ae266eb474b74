//! Flat little-endian physical memory backing the reference machine.

/// Access-width and bounds policy helpers.
pub mod access;

pub use access::{translate, validate_width, WORD_ACCESS_BYTES};

use crate::{MemoryFault, Word};

/// Guest physical address where memory (and the default entry point) begins.
pub const MEMORY_BASE: Word = 0x8000_0000;

/// Default physical memory size (128 MiB).
pub const DEFAULT_MEMORY_SIZE: usize = 0x0800_0000;

/// Zero-initialised physical memory window `[base, base + size)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalMemory {
    base: Word,
    bytes: Box<[u8]>,
}

impl PhysicalMemory {
    /// Allocates a zeroed window of `size` bytes starting at `base`.
    #[must_use]
    pub fn new(base: Word, size: usize) -> Self {
        Self {
            base,
            bytes: vec![0; size].into_boxed_slice(),
        }
    }

    /// First guest address of the window.
    #[must_use]
    pub const fn base(&self) -> Word {
        self.base
    }

    /// Window size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Reads `width` bytes little-endian and zero-extends them to a word.
    ///
    /// # Errors
    ///
    /// Returns a [`MemoryFault`] for unsupported widths or out-of-range
    /// addresses.
    pub fn read(&self, addr: Word, width: usize) -> Result<Word, MemoryFault> {
        validate_width(width)?;
        let offset = translate(self.base, self.bytes.len(), addr, width)?;
        let value = self.bytes[offset..offset + width]
            .iter()
            .rev()
            .fold(0, |acc, byte| (acc << 8) | Word::from(*byte));
        Ok(value)
    }

    /// Writes the low `width` bytes of `value` little-endian.
    ///
    /// # Errors
    ///
    /// Returns a [`MemoryFault`] for unsupported widths or out-of-range
    /// addresses.
    pub fn write(&mut self, addr: Word, width: usize, value: Word) -> Result<(), MemoryFault> {
        validate_width(width)?;
        let offset = translate(self.base, self.bytes.len(), addr, width)?;
        let bytes = value.to_le_bytes();
        self.bytes[offset..offset + width].copy_from_slice(&bytes[..width]);
        Ok(())
    }

    /// Copies a raw program image to the start of the window.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::ImageTooLarge`] when the image does not fit.
    pub fn load(&mut self, image: &[u8]) -> Result<(), MemoryFault> {
        let capacity = self.bytes.len();
        let target = self
            .bytes
            .get_mut(..image.len())
            .ok_or(MemoryFault::ImageTooLarge {
                len: image.len(),
                capacity,
            })?;
        target.copy_from_slice(image);
        Ok(())
    }
}
