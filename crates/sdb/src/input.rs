//! Line sources feeding the command loop.

use std::io::BufRead;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::errors::SessionError;

/// Prompt shown by the interactive editor.
pub const PROMPT: &str = "(sdb) ";

/// Supplies command lines until input ends.
pub trait LineSource {
    /// Next line without its terminator, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when the underlying input fails.
    fn next_line(&mut self) -> Result<Option<String>, SessionError>;
}

/// Reads plain lines from a buffered reader (piped stdin, scripts).
#[derive(Debug)]
pub struct ScriptSource<R> {
    reader: R,
}

impl<R: BufRead> ScriptSource<R> {
    /// Wraps a reader.
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ScriptSource<R> {
    fn next_line(&mut self) -> Result<Option<String>, SessionError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// Interactive editor with history.
pub struct EditorSource {
    editor: DefaultEditor,
}

impl EditorSource {
    /// Opens the terminal editor.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Readline`] when the terminal cannot be set up.
    pub fn new() -> Result<Self, SessionError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for EditorSource {
    fn next_line(&mut self) -> Result<Option<String>, SessionError> {
        match self.editor.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{LineSource, ScriptSource};

    #[test]
    fn script_lines_lose_terminators() {
        let mut source = ScriptSource::new(Cursor::new("si 2\r\np $a0\n\nq"));
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().expect("read succeeds") {
            lines.push(line);
        }
        assert_eq!(lines, ["si 2", "p $a0", "", "q"]);
    }
}
