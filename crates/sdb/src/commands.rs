//! Static command table and handlers.
//!
//! Each handler receives the monitor and the trimmed remainder of the line
//! (`None` when nothing follows the command name).

#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation
)]

use sdb_core::{register_name, RunState, WatchId, Word, GENERAL_REGISTER_COUNT, WORD_ACCESS_BYTES};
use tracing::debug;

use crate::errors::CommandError;
use crate::monitor::{Monitor, RUN_FOREVER};

/// What the command loop does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Leave the command loop.
    Quit,
}

/// Command handler signature.
pub type Handler = fn(&mut Monitor, Option<&str>) -> Result<Flow, CommandError>;

/// One command table entry.
#[derive(Debug, Clone, Copy)]
pub struct Command {
    /// Name matched against the first word of the line.
    pub name: &'static str,
    /// One-line description shown by `help`.
    pub description: &'static str,
    /// Implementation.
    pub handler: Handler,
}

/// Every monitor command, in `help` order.
pub const COMMAND_TABLE: &[Command] = &[
    Command {
        name: "help",
        description: "Display information about all supported commands",
        handler: cmd_help,
    },
    Command {
        name: "c",
        description: "Continue the execution of the program",
        handler: cmd_c,
    },
    Command {
        name: "q",
        description: "Exit SDB",
        handler: cmd_q,
    },
    Command {
        name: "si",
        description: "Step N instructions (default 1): si [N]",
        handler: cmd_si,
    },
    Command {
        name: "info",
        description: "Print registers (info r) or watchpoints (info w)",
        handler: cmd_info,
    },
    Command {
        name: "x",
        description: "Examine N words of memory at EXPR: x N EXPR",
        handler: cmd_x,
    },
    Command {
        name: "p",
        description: "Evaluate and print an expression: p EXPR",
        handler: cmd_p,
    },
    Command {
        name: "w",
        description: "Stop when the value of EXPR changes: w EXPR",
        handler: cmd_w,
    },
    Command {
        name: "d",
        description: "Delete watchpoint N: d N",
        handler: cmd_d,
    },
];

/// Looks a command up by exact name.
#[must_use]
pub fn find_command(name: &str) -> Option<&'static Command> {
    COMMAND_TABLE.iter().find(|command| command.name == name)
}

fn cmd_help(monitor: &mut Monitor, args: Option<&str>) -> Result<Flow, CommandError> {
    let out = monitor.out();
    match args {
        None => {
            for command in COMMAND_TABLE {
                writeln!(out, "{} - {}", command.name, command.description)?;
            }
        }
        Some(name) => match find_command(name) {
            Some(command) => writeln!(out, "{} - {}", command.name, command.description)?,
            None => writeln!(out, "Unknown command '{name}'")?,
        },
    }
    Ok(Flow::Continue)
}

fn cmd_c(monitor: &mut Monitor, _args: Option<&str>) -> Result<Flow, CommandError> {
    monitor.execute(RUN_FOREVER)?;
    Ok(Flow::Continue)
}

fn cmd_q(monitor: &mut Monitor, _args: Option<&str>) -> Result<Flow, CommandError> {
    monitor.target_mut().set_run_state(RunState::Quit);
    Ok(Flow::Quit)
}

/// First whitespace-delimited word of the arguments; the rest is ignored.
fn first_word(args: Option<&str>) -> Option<&str> {
    args.and_then(|args| args.split_whitespace().next())
}

fn cmd_si(monitor: &mut Monitor, args: Option<&str>) -> Result<Flow, CommandError> {
    let steps = match first_word(args).map(str::parse::<u64>) {
        None => 1,
        Some(Ok(steps)) if steps > 0 => steps,
        Some(_) => {
            writeln!(monitor.out(), "Wrong si option! default option == 1")?;
            1
        }
    };
    monitor.execute(steps)?;
    Ok(Flow::Continue)
}

fn cmd_info(monitor: &mut Monitor, args: Option<&str>) -> Result<Flow, CommandError> {
    match first_word(args) {
        None => Err(CommandError::MissingArgument("Need option!")),
        Some("r") => {
            print_registers(monitor)?;
            Ok(Flow::Continue)
        }
        Some("w") => {
            print_watchpoints(monitor)?;
            Ok(Flow::Continue)
        }
        Some(other) => Err(CommandError::UnknownSubcommand(other.to_string())),
    }
}

fn print_registers(monitor: &mut Monitor) -> Result<(), CommandError> {
    let pc = monitor.target().pc();
    let values: Vec<Word> = (0..GENERAL_REGISTER_COUNT)
        .map(|index| monitor.target().register(index).unwrap_or(0))
        .collect();

    let out = monitor.out();
    writeln!(out, "pc       {:<#10x}    {}", pc, pc as i32)?;
    for (index, value) in values.into_iter().enumerate() {
        let name = register_name(index).unwrap_or("?");
        writeln!(out, "{name:<3}      {value:<#10x}    {}", value as i32)?;
    }
    Ok(())
}

fn print_watchpoints(monitor: &mut Monitor) -> Result<(), CommandError> {
    let lines: Vec<String> = monitor
        .watchpoints()
        .active()
        .map(|record| {
            format!(
                "Watch point [{}]: [{}] value:[{}]",
                record.id, record.expression, record.last_value
            )
        })
        .collect();

    let out = monitor.out();
    if lines.is_empty() {
        writeln!(out, "No watchpoints")?;
    }
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn cmd_x(monitor: &mut Monitor, args: Option<&str>) -> Result<Flow, CommandError> {
    const USAGE: &str = "usage: x N EXPR";
    let (count, expression) = args
        .and_then(|args| args.split_once(char::is_whitespace))
        .ok_or(CommandError::MissingArgument(USAGE))?;
    let count: Word = count.parse().map_err(|_| CommandError::InvalidArgument {
        value: count.to_string(),
        reason: "expected a word count",
    })?;
    let base = monitor.evaluate(expression.trim())? as Word;

    for offset in 0..count {
        let addr = base.wrapping_add(offset.wrapping_mul(WORD_ACCESS_BYTES as Word));
        let value = monitor.target().read_memory(addr, WORD_ACCESS_BYTES)?;
        writeln!(monitor.out(), "{addr:#x}:    {value:#010x}")?;
    }
    Ok(Flow::Continue)
}

fn cmd_p(monitor: &mut Monitor, args: Option<&str>) -> Result<Flow, CommandError> {
    let expression = args.ok_or(CommandError::MissingArgument("usage: p EXPR"))?;
    let value = monitor.evaluate(expression)?;
    writeln!(monitor.out(), "{value}")?;
    Ok(Flow::Continue)
}

fn cmd_w(monitor: &mut Monitor, args: Option<&str>) -> Result<Flow, CommandError> {
    let expression = args.ok_or(CommandError::MissingArgument("usage: w EXPR"))?;
    let value = monitor.evaluate(expression)?;
    let id = monitor
        .watchpoints_mut()
        .allocate(expression, value)
        .ok_or(CommandError::PoolExhausted)?;
    writeln!(monitor.out(), "Watchpoint {id}: {expression}")?;
    Ok(Flow::Continue)
}

fn cmd_d(monitor: &mut Monitor, args: Option<&str>) -> Result<Flow, CommandError> {
    let text = first_word(args).ok_or(CommandError::MissingArgument("usage: d N"))?;
    let index: usize = text.parse().map_err(|_| CommandError::InvalidArgument {
        value: text.to_string(),
        reason: "expected a watchpoint number",
    })?;
    // Unknown numbers are ignored.
    let released =
        WatchId::from_index(index).is_some_and(|id| monitor.watchpoints_mut().release(id));
    debug!(index, released, "delete watchpoint");
    Ok(Flow::Continue)
}
