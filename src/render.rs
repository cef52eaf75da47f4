//! Output rendering for the chat REPL.
//!
//! This module provides a trait-based rendering abstraction so the session engine never
//! writes to the console directly. The default implementation writes to stdout/stderr and
//! optionally styles informational and error lines with ANSI escape codes.

use std::io::{self, Stderr, Stdout, Write};

/// ANSI escape code for dim text (used for info lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for the assistant prefix).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Text printed when an interrupt cancels an in-flight request.
pub const INTERRUPT_NOTICE: &str = "Interrupt received. Canceling generation...";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Recording renderers in tests
pub trait Renderer: Send {
    /// Print the label that precedes an assistant answer.
    fn print_assistant_prefix(&mut self);

    /// Print one streamed delta, without a trailing newline.
    ///
    /// This is called incrementally, in arrival order, as tokens are streamed.
    fn print_token(&mut self, token: &str);

    /// Print a complete block of text followed by a newline.
    fn print_text(&mut self, text: &str);

    /// End the current line.
    fn newline(&mut self);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Called when a user interrupt cancels the in-flight request.
    fn print_interrupted(&mut self) {
        self.newline();
        self.print_info(INTERRUPT_NOTICE);
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    stderr: Stderr,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            stderr: io::stderr(),
            use_color,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_assistant_prefix(&mut self) {
        if self.use_color {
            let _ = write!(self.stdout, "{ANSI_BOLD}assistant>{ANSI_RESET} ");
        } else {
            let _ = write!(self.stdout, "assistant> ");
        }
        self.flush();
    }

    fn print_token(&mut self, token: &str) {
        let _ = write!(self.stdout, "{token}");
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        let _ = writeln!(self.stdout, "{text}");
        self.flush();
    }

    fn newline(&mut self) {
        let _ = writeln!(self.stdout);
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        if self.use_color {
            let _ = writeln!(self.stdout, "{ANSI_DIM}[info] {info}{ANSI_RESET}");
        } else {
            let _ = writeln!(self.stdout, "[info] {info}");
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.flush();
        if self.use_color {
            let _ = writeln!(self.stderr, "{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            let _ = writeln!(self.stderr, "Error: {error}");
        }
    }
}
