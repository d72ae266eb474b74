//! CLI entry point for the SDB monitor binary.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use rustyline as _;
use sdb::errors::SessionError;
use sdb::{run, SessionConfig};
use sdb_core::DEFAULT_MEMORY_SIZE;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Simple debugger for the reference RV32I simulator.
#[derive(Debug, Parser)]
#[command(name = "sdb", version)]
struct Args {
    /// Run the program to completion without reading commands.
    #[arg(short, long)]
    batch: bool,

    /// Write debug logs to FILE instead of stderr.
    #[arg(short, long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Physical memory size in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MEMORY_SIZE)]
    mem_size: usize,

    /// Raw program image loaded at the memory base.
    image: Option<PathBuf>,
}

impl From<Args> for SessionConfig {
    fn from(args: Args) -> Self {
        Self {
            batch: args.batch,
            image: args.image,
            log_file: args.log,
            mem_size: args.mem_size,
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<(), SessionError> {
    match log_file {
        Some(path) => {
            let file = File::create(path).map_err(|source| SessionError::LogFile {
                path: path.to_path_buf(),
                source,
            })?;
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("debug"))
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn run_cli(config: &SessionConfig) -> Result<bool, SessionError> {
    init_logging(config.log_file.as_deref())?;
    debug!(?config, "starting session");
    run(config)
}

fn main() {
    let config = SessionConfig::from(Args::parse());
    let exit_code = match run_cli(&config) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(error) => {
            eprintln!("error: {error}");
            1
        }
    };
    std::process::exit(exit_code);
}
