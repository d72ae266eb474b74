//! Access-width and bounds policy for physical memory.

use crate::{MemoryFault, Word};

/// Byte width of a full machine-word access.
pub const WORD_ACCESS_BYTES: usize = 4;

/// Validates that `width` is a supported access size (1, 2, or 4 bytes).
///
/// # Errors
///
/// Returns [`MemoryFault::UnsupportedWidth`] for any other width.
pub const fn validate_width(width: usize) -> Result<(), MemoryFault> {
    match width {
        1 | 2 | WORD_ACCESS_BYTES => Ok(()),
        other => Err(MemoryFault::UnsupportedWidth(other)),
    }
}

/// Translates a guest physical address into an offset within a window of
/// `size` bytes starting at `base`, checking that all `width` bytes fit.
///
/// # Errors
///
/// Returns [`MemoryFault::OutOfBounds`] when any byte of the access lies
/// outside `[base, base + size)`.
pub fn translate(base: Word, size: usize, addr: Word, width: usize) -> Result<usize, MemoryFault> {
    let out_of_bounds = MemoryFault::OutOfBounds { addr, width };
    let offset = addr.checked_sub(base).ok_or(out_of_bounds)?;
    let offset = usize::try_from(offset).map_err(|_| out_of_bounds)?;
    let end = offset.checked_add(width).ok_or(out_of_bounds)?;
    if end > size {
        return Err(out_of_bounds);
    }
    Ok(offset)
}
