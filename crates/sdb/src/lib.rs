//! SDB, the simple debugger monitor for the reference RV32I simulator.

use clap as _;
use tracing_subscriber as _;

/// Static command table and command handlers.
pub mod commands;
/// Session configuration.
pub mod config;
/// Command and session error types.
pub mod errors;
/// Program image loading and the built-in image.
pub mod image;
/// Interactive and scripted line sources.
pub mod input;
/// Monitor state, execution control, and the command loop.
pub mod monitor;

pub use commands::{find_command, Command, Flow, COMMAND_TABLE};
pub use config::SessionConfig;
pub use errors::{CommandError, SessionError};
pub use monitor::{run, Monitor};
