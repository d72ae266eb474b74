//! Monitor session: execution control, the watchpoint sweep, and the command
//! loop.

use std::io::{self, IsTerminal, Write};

use sdb_core::{ExprEngine, ExprError, Machine, RunState, StepOutcome, Target, WatchId, WatchPool};
use tracing::{debug, warn};

use crate::commands::{find_command, Flow};
use crate::config::SessionConfig;
use crate::errors::{CommandError, SessionError};
use crate::image::load_image;
use crate::input::{EditorSource, LineSource, ScriptSource};

/// Step count meaning "run until something stops execution".
pub const RUN_FOREVER: u64 = u64::MAX;

/// Retired instructions are echoed when a run asks for fewer steps than this.
pub const TRACE_STEP_LIMIT: u64 = 10;

/// Debugger state bound to one target and one output stream.
pub struct Monitor {
    target: Box<dyn Target>,
    engine: ExprEngine,
    watchpoints: WatchPool,
    out: Box<dyn Write>,
}

impl Monitor {
    /// Creates a monitor with an empty watchpoint pool.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rules`] if the expression rules fail to compile.
    pub fn new(target: Box<dyn Target>, out: Box<dyn Write>) -> Result<Self, SessionError> {
        Ok(Self {
            target,
            engine: ExprEngine::new()?,
            watchpoints: WatchPool::new(),
            out,
        })
    }

    /// The debugged machine.
    #[must_use]
    pub fn target(&self) -> &dyn Target {
        self.target.as_ref()
    }

    /// Mutable access to the debugged machine.
    pub fn target_mut(&mut self) -> &mut dyn Target {
        self.target.as_mut()
    }

    /// Installed watchpoints.
    #[must_use]
    pub const fn watchpoints(&self) -> &WatchPool {
        &self.watchpoints
    }

    pub(crate) const fn watchpoints_mut(&mut self) -> &mut WatchPool {
        &mut self.watchpoints
    }

    pub(crate) fn out(&mut self) -> &mut dyn Write {
        self.out.as_mut()
    }

    /// Evaluates an expression against the current machine state. Input the
    /// lexer cannot match is echoed with a caret under the failing column.
    ///
    /// # Errors
    ///
    /// Returns the engine's error for malformed or faulting expressions.
    pub fn evaluate(&mut self, expression: &str) -> Result<i32, CommandError> {
        match self.engine.evaluate(expression, self.target.as_ref()) {
            Err(ExprError::NoMatch { position }) => {
                writeln!(self.out, "{expression}\n{:>width$}", "^", width = position + 1)?;
                Err(ExprError::NoMatch { position }.into())
            }
            result => Ok(result?),
        }
    }

    /// Executes up to `count` instructions, stopping early on a trap, a fault,
    /// or a watchpoint change.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if console output fails.
    pub fn execute(&mut self, count: u64) -> io::Result<()> {
        if self.target.run_state().has_ended() {
            writeln!(
                self.out,
                "Program execution has ended. To restart the program, exit and run again."
            )?;
            return Ok(());
        }

        self.target.set_run_state(RunState::Running);
        let trace = count < TRACE_STEP_LIMIT;

        for _ in 0..count {
            match self.target.step() {
                StepOutcome::Retired { pc, raw } => {
                    debug!("retired {pc:#010x}: {raw:08x}");
                    if trace {
                        let line = self.target.describe(pc, raw);
                        writeln!(self.out, "{line}")?;
                    }
                }
                StepOutcome::Trapped { .. } => {}
                StepOutcome::Fault { cause, .. } => writeln!(self.out, "{cause}")?,
            }
            if self.target.run_state() != RunState::Running {
                break;
            }
            if self.check_watchpoints()? {
                self.target.set_run_state(RunState::Stop);
                break;
            }
        }

        match self.target.run_state() {
            RunState::Running => self.target.set_run_state(RunState::Stop),
            RunState::End { pc, code } => {
                let verdict = if code == 0 {
                    "HIT GOOD TRAP"
                } else {
                    "HIT BAD TRAP"
                };
                writeln!(self.out, "sdb: {verdict} at pc = {pc:#010x}")?;
            }
            RunState::Abort { pc } => writeln!(self.out, "sdb: ABORT at pc = {pc:#010x}")?,
            RunState::Stop | RunState::Quit => {}
        }
        Ok(())
    }

    /// Re-evaluates every active watchpoint, reports each changed value, and
    /// stores it. Returns `true` when any value changed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if console output fails.
    pub fn check_watchpoints(&mut self) -> io::Result<bool> {
        let mut changed: Vec<(WatchId, i32)> = Vec::new();
        for record in self.watchpoints.active() {
            match self
                .engine
                .evaluate(&record.expression, self.target.as_ref())
            {
                Ok(value) if value != record.last_value => changed.push((record.id, value)),
                Ok(_) => {}
                Err(error) => warn!(id = %record.id, %error, "watchpoint expression failed"),
            }
        }

        for &(id, value) in &changed {
            if let Some(record) = self.watchpoints.find_mut(id) {
                debug!(%id, old = record.last_value, new = value, "watchpoint triggered");
                writeln!(
                    self.out,
                    "Watchpoint {id}: {}\nOld value = {}\nNew value = {value}",
                    record.expression, record.last_value
                )?;
                record.last_value = value;
            }
        }
        Ok(!changed.is_empty())
    }

    /// Parses and runs one command line. Command failures are printed and
    /// do not end the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when console output fails.
    pub fn dispatch_line(&mut self, line: &str) -> Result<Flow, SessionError> {
        let line = line.trim();
        let (name, args) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, Some(rest.trim()).filter(|rest| !rest.is_empty())),
            None => (line, None),
        };
        if name.is_empty() {
            return Ok(Flow::Continue);
        }

        let Some(command) = find_command(name) else {
            writeln!(self.out, "Unknown command '{name}'")?;
            return Ok(Flow::Continue);
        };

        match (command.handler)(self, args) {
            Ok(flow) => Ok(flow),
            Err(CommandError::Io(error)) => Err(error.into()),
            Err(error) => {
                debug!(command = name, %error, "command failed");
                writeln!(self.out, "error: {error}")?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Reads and dispatches lines until input ends or a command quits.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when input or output fails.
    pub fn mainloop(&mut self, input: &mut dyn LineSource) -> Result<(), SessionError> {
        while let Some(line) = input.next_line()? {
            if self.dispatch_line(&line)? == Flow::Quit {
                break;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Runs the program to completion without reading commands.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when console output fails.
    pub fn run_batch(&mut self) -> Result<(), SessionError> {
        self.execute(RUN_FOREVER)?;
        self.out.flush()?;
        Ok(())
    }

    /// Process-level verdict for the session.
    #[must_use]
    pub fn is_good_exit(&self) -> bool {
        self.target.run_state().is_good_exit()
    }
}

/// Builds the machine and monitor for `config` and runs the session on the
/// process's stdin and stdout. Returns `true` for a good exit.
///
/// # Errors
///
/// Returns a [`SessionError`] for image, terminal, or console failures.
pub fn run(config: &SessionConfig) -> Result<bool, SessionError> {
    let mut machine = Machine::new(&config.machine_config());
    load_image(&mut machine, config.image.as_deref())?;
    let mut monitor = Monitor::new(Box::new(machine), Box::new(io::stdout()))?;

    if config.batch {
        monitor.run_batch()?;
    } else if io::stdin().is_terminal() {
        monitor.mainloop(&mut EditorSource::new()?)?;
    } else {
        monitor.mainloop(&mut ScriptSource::new(io::stdin().lock()))?;
    }
    Ok(monitor.is_good_exit())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use super::{Monitor, RUN_FOREVER};
    use crate::commands::Flow;
    use crate::image::builtin_image_bytes;
    use crate::input::ScriptSource;
    use sdb_core::{Machine, MachineConfig, RunState, Target, MEMORY_BASE};

    /// Output sink the test keeps a handle to.
    #[derive(Clone, Default)]
    pub(crate) struct SharedOutput(Rc<RefCell<Vec<u8>>>);

    impl SharedOutput {
        pub(crate) fn take(&self) -> String {
            String::from_utf8(self.0.borrow_mut().drain(..).collect()).expect("utf-8 output")
        }
    }

    impl Write for SharedOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn monitor_with(words: &[u32]) -> (Monitor, SharedOutput) {
        let mut machine = Machine::new(&MachineConfig {
            mem_size: 0x1000,
            ..MachineConfig::default()
        });
        let image: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        machine.load_image(&image).expect("image fits");
        let output = SharedOutput::default();
        let monitor =
            Monitor::new(Box::new(machine), Box::new(output.clone())).expect("monitor builds");
        (monitor, output)
    }

    pub(crate) fn builtin_monitor() -> (Monitor, SharedOutput) {
        let mut machine = Machine::new(&MachineConfig {
            mem_size: 0x1000,
            ..MachineConfig::default()
        });
        machine
            .load_image(&builtin_image_bytes())
            .expect("image fits");
        let output = SharedOutput::default();
        let monitor =
            Monitor::new(Box::new(machine), Box::new(output.clone())).expect("monitor builds");
        (monitor, output)
    }

    // addi a0, a0, 1 ; addi a0, a0, 1 ; addi a0, a0, 1 ; ebreak
    const COUNTER: [u32; 4] = [0x0015_0513, 0x0015_0513, 0x0015_0513, 0x0010_0073];

    #[test]
    fn short_runs_echo_each_instruction() {
        let (mut monitor, output) = builtin_monitor();
        monitor.execute(2).expect("execute");
        assert_eq!(
            output.take(),
            "0x80000000: 00000297  auipc t0, 0x0\n0x80000004: 00028823  sb zero, 16(t0)\n"
        );
        assert_eq!(monitor.target().run_state(), RunState::Stop);
        assert_eq!(monitor.target().pc(), MEMORY_BASE + 8);
    }

    #[test]
    fn long_runs_are_silent_until_the_trap() {
        let (mut monitor, output) = builtin_monitor();
        monitor.execute(RUN_FOREVER).expect("execute");
        assert_eq!(output.take(), "sdb: HIT GOOD TRAP at pc = 0x8000000c\n");
        assert!(monitor.is_good_exit());

        monitor.execute(1).expect("execute");
        assert_eq!(
            output.take(),
            "Program execution has ended. To restart the program, exit and run again.\n"
        );
    }

    #[test]
    fn nonzero_exit_code_is_a_bad_trap() {
        let (mut monitor, output) = monitor_with(&COUNTER);
        monitor.execute(RUN_FOREVER).expect("execute");
        assert_eq!(output.take(), "sdb: HIT BAD TRAP at pc = 0x8000000c\n");
        assert!(!monitor.is_good_exit());
    }

    #[test]
    fn fault_aborts_the_program() {
        let (mut monitor, output) = monitor_with(&[0xFFFF_FFFF]);
        monitor.execute(RUN_FOREVER).expect("execute");
        assert_eq!(
            output.take(),
            "invalid instruction 0xffffffff\nsdb: ABORT at pc = 0x80000000\n"
        );
        assert_eq!(
            monitor.target().run_state(),
            RunState::Abort { pc: MEMORY_BASE }
        );
    }

    #[test]
    fn watchpoint_change_stops_execution() {
        let (mut monitor, output) = monitor_with(&COUNTER);
        monitor.watchpoints_mut().allocate("$a0", 0);

        monitor.execute(RUN_FOREVER).expect("execute");
        assert_eq!(
            output.take(),
            "Watchpoint 0: $a0\nOld value = 0\nNew value = 1\n"
        );
        assert_eq!(monitor.target().run_state(), RunState::Stop);
        assert_eq!(monitor.target().pc(), MEMORY_BASE + 4);

        monitor.execute(RUN_FOREVER).expect("execute");
        assert_eq!(
            output.take(),
            "Watchpoint 0: $a0\nOld value = 1\nNew value = 2\n"
        );
    }

    #[test]
    fn unchanged_watchpoints_do_not_stop() {
        let (mut monitor, output) = monitor_with(&COUNTER);
        monitor.watchpoints_mut().allocate("$sp", 0);
        monitor.execute(RUN_FOREVER).expect("execute");
        assert_eq!(output.take(), "sdb: HIT BAD TRAP at pc = 0x8000000c\n");
    }

    #[test]
    fn dispatcher_reports_unknown_commands_and_continues() {
        let (mut monitor, output) = builtin_monitor();
        assert_eq!(
            monitor.dispatch_line("frobnicate 3").expect("dispatch"),
            Flow::Continue
        );
        assert_eq!(output.take(), "Unknown command 'frobnicate'\n");
        assert_eq!(monitor.dispatch_line("   ").expect("dispatch"), Flow::Continue);
        assert_eq!(output.take(), "");
    }

    #[test]
    fn mainloop_stops_at_quit() {
        let (mut monitor, output) = builtin_monitor();
        let mut script = ScriptSource::new("p 1+2*3\nq\np 5\n".as_bytes());
        monitor.mainloop(&mut script).expect("mainloop");
        assert_eq!(output.take(), "7\n");
        assert_eq!(monitor.target().run_state(), RunState::Quit);
        assert!(monitor.is_good_exit());
    }

    #[test]
    fn end_of_input_without_quit_is_not_a_good_exit() {
        let (mut monitor, _output) = builtin_monitor();
        let mut script = ScriptSource::new("si\n".as_bytes());
        monitor.mainloop(&mut script).expect("mainloop");
        assert!(!monitor.is_good_exit());
    }

    #[test]
    fn batch_mode_runs_to_completion() {
        let (mut monitor, output) = builtin_monitor();
        monitor.run_batch().expect("batch");
        assert_eq!(output.take(), "sdb: HIT GOOD TRAP at pc = 0x8000000c\n");
        assert!(monitor.is_good_exit());
    }
}
