//! Line input for the REPL.

use std::io;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::error::{Error, Result};

/// Outcome of reading one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadLine {
    /// A line of text, without its terminator.
    Line(String),
    /// The user pressed ctrl-c at the prompt.
    Interrupted,
    /// Input is exhausted (ctrl-d or end of a pipe).
    Eof,
}

/// A source of user input lines.
pub trait LineReader {
    /// Show `prompt` and block until a line is available.
    fn read_line(&mut self, prompt: &str) -> Result<ReadLine>;

    /// Remember a line for history navigation.
    fn add_history(&mut self, _line: &str) {}
}

/// Interactive line editor backed by `rustyline`.
pub struct RustylineReader {
    editor: DefaultEditor,
}

impl RustylineReader {
    /// Create a line editor attached to the terminal.
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().map_err(readline_error)?;
        Ok(Self { editor })
    }
}

impl LineReader for RustylineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadLine> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadLine::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadLine::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadLine::Eof),
            Err(err) => Err(readline_error(err)),
        }
    }

    fn add_history(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }
}

fn readline_error(err: ReadlineError) -> Error {
    match err {
        ReadlineError::Io(err) => Error::io(format!("read input: {err}"), err),
        err => Error::io(format!("read input: {err}"), io::Error::other(err.to_string())),
    }
}
