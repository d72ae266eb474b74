//! Session configuration assembled from the command line.

use std::path::PathBuf;

use sdb_core::{MachineConfig, DEFAULT_MEMORY_SIZE};

/// Options for one monitor session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Run the program to completion without reading commands.
    pub batch: bool,
    /// Raw program image; the built-in image is used when absent.
    pub image: Option<PathBuf>,
    /// Debug log destination; logs go to stderr when absent.
    pub log_file: Option<PathBuf>,
    /// Physical memory size in bytes.
    pub mem_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch: false,
            image: None,
            log_file: None,
            mem_size: DEFAULT_MEMORY_SIZE,
        }
    }
}

impl SessionConfig {
    /// Machine layout for this session.
    #[must_use]
    pub fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            mem_size: self.mem_size,
            ..MachineConfig::default()
        }
    }
}
