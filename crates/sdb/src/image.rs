//! Program image loading.

use std::fs;
use std::path::Path;

use sdb_core::Machine;
use tracing::info;

use crate::errors::SessionError;

/// Program used when no image is given: store a zero byte, load it back into
/// `a0`, and trap with exit code 0.
pub const BUILTIN_IMAGE: [u32; 5] = [
    0x0000_0297, // auipc t0, 0
    0x0002_8823, // sb    zero, 16(t0)
    0x0102_C503, // lbu   a0, 16(t0)
    0x0010_0073, // ebreak
    0xDEAD_BEEF, // data
];

/// Little-endian bytes of [`BUILTIN_IMAGE`].
#[must_use]
pub fn builtin_image_bytes() -> Vec<u8> {
    BUILTIN_IMAGE
        .iter()
        .flat_map(|word| word.to_le_bytes())
        .collect()
}

/// Loads `path`, or the built-in image, at the start of memory and returns
/// the image size in bytes.
///
/// # Errors
///
/// Returns [`SessionError::Image`] when the file cannot be read and
/// [`SessionError::Memory`] when it does not fit.
pub fn load_image(machine: &mut Machine, path: Option<&Path>) -> Result<usize, SessionError> {
    let bytes = match path {
        Some(path) => {
            let bytes = fs::read(path).map_err(|source| SessionError::Image {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), size = bytes.len(), "loaded image");
            bytes
        }
        None => {
            info!("no image given, using the built-in image");
            builtin_image_bytes()
        }
    };
    machine.load_image(&bytes)?;
    Ok(bytes.len())
}
