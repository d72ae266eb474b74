//! Error types for monitor commands and the session around them.
//!
//! [`CommandError`] is always recoverable: the dispatcher prints it as
//! `error: <message>` and reads the next line. [`SessionError`] ends the
//! session and becomes a non-zero exit status.

use std::io;
use std::path::PathBuf;

use rustyline::error::ReadlineError;
use sdb_core::{ExprError, MemoryFault, RuleError, WATCHPOINT_POOL_SIZE};
use thiserror::Error;

/// Failure of a single monitor command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required argument was not supplied.
    #[error("{0}")]
    MissingArgument(&'static str),
    /// Argument could not be parsed.
    #[error("invalid argument '{value}': {reason}")]
    InvalidArgument {
        /// Offending text.
        value: String,
        /// What was expected.
        reason: &'static str,
    },
    /// Subcommand is not recognised.
    #[error("unknown subcommand '{0}'")]
    UnknownSubcommand(String),
    /// Every watchpoint slot is in use.
    #[error("no free watchpoint (all {WATCHPOINT_POOL_SIZE} slots in use)")]
    PoolExhausted,
    /// Expression failed to tokenize or evaluate.
    #[error(transparent)]
    Expr(#[from] ExprError),
    /// Memory scan touched invalid memory.
    #[error(transparent)]
    Memory(#[from] MemoryFault),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Failure that ends the monitor session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Console output or input failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// Program image could not be read.
    #[error("failed to read image {}: {source}", path.display())]
    Image {
        /// Image path.
        path: PathBuf,
        /// Underlying read error.
        #[source]
        source: io::Error,
    },
    /// Program image does not fit in memory.
    #[error(transparent)]
    Memory(#[from] MemoryFault),
    /// Expression rules failed to compile.
    #[error(transparent)]
    Rules(#[from] RuleError),
    /// Line editor failed.
    #[error("line editor error: {0}")]
    Readline(#[from] ReadlineError),
    /// Log file could not be created.
    #[error("failed to open log file {}: {source}", path.display())]
    LogFile {
        /// Log file path.
        path: PathBuf,
        /// Underlying open error.
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::{CommandError, SessionError};
    use sdb_core::{ExprError, MemoryFault};

    #[test]
    fn command_errors_render_for_the_console() {
        assert_eq!(
            CommandError::MissingArgument("Need option!").to_string(),
            "Need option!"
        );
        assert_eq!(
            CommandError::InvalidArgument {
                value: "abc".into(),
                reason: "expected a count"
            }
            .to_string(),
            "invalid argument 'abc': expected a count"
        );
        assert_eq!(
            CommandError::PoolExhausted.to_string(),
            "no free watchpoint (all 32 slots in use)"
        );
        assert_eq!(
            CommandError::from(ExprError::DivideByZero).to_string(),
            "division by zero"
        );
    }

    #[test]
    fn session_errors_wrap_faults() {
        let error = SessionError::from(MemoryFault::ImageTooLarge {
            len: 16,
            capacity: 8,
        });
        assert_eq!(
            error.to_string(),
            "image of 16 bytes does not fit in 8 bytes of physical memory"
        );
    }
}
