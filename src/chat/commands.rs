//! Slash command parsing for the chat application.
//!
//! Lines that start with `/` control the session instead of being sent to the model. Parsing
//! is pure: every input maps to exactly one [`SlashCommand`] or one [`Error::Command`].

use crate::error::{Error, Result};

/// Marker that starts a slash command.
const COMMAND_MARKER: char = '/';

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    /// Show the available commands.
    Help,

    /// Use a different model for subsequent turns.
    Model(String),

    /// Turn streaming on or off for subsequent turns.
    Stream(bool),

    /// Clear the conversation, keeping the system prompt.
    Reset,

    /// Save the transcript now.
    /// `None` means the previously used path, or the default file name.
    Save(Option<String>),

    /// Leave the chat.
    Exit,
}

impl SlashCommand {
    /// Returns the command name without the marker.
    pub fn name(&self) -> &'static str {
        match self {
            SlashCommand::Help => "help",
            SlashCommand::Model(_) => "model",
            SlashCommand::Stream(_) => "stream",
            SlashCommand::Reset => "reset",
            SlashCommand::Save(_) => "save",
            SlashCommand::Exit => "exit",
        }
    }

    /// Returns the normalized argument; empty for commands without one.
    pub fn argument(&self) -> &str {
        match self {
            SlashCommand::Model(model) => model,
            SlashCommand::Stream(true) => "on",
            SlashCommand::Stream(false) => "off",
            SlashCommand::Save(Some(path)) => path,
            SlashCommand::Save(None)
            | SlashCommand::Help
            | SlashCommand::Reset
            | SlashCommand::Exit => "",
        }
    }
}

/// Parses one line of user input as a slash command.
///
/// # Examples
///
/// ```
/// # use gonkagate_chat::chat::{SlashCommand, parse_command};
/// assert_eq!(parse_command("/exit").unwrap(), SlashCommand::Exit);
/// assert_eq!(
///     parse_command("/model gpt-x").unwrap(),
///     SlashCommand::Model("gpt-x".to_string())
/// );
/// assert!(parse_command("Hello!").is_err());
/// ```
pub fn parse_command(input: &str) -> Result<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with(COMMAND_MARKER) {
        return Err(Error::command(format!("not a slash command: {input:?}")));
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let first = fields[0].to_lowercase();
    let name = first.strip_prefix(COMMAND_MARKER).unwrap_or(&first);
    let args = &fields[1..];

    match name {
        "help" | "reset" | "exit" => {
            if !args.is_empty() {
                return Err(Error::command(format!("/{name} does not accept arguments")));
            }
            Ok(match name {
                "help" => SlashCommand::Help,
                "reset" => SlashCommand::Reset,
                _ => SlashCommand::Exit,
            })
        }
        "model" => {
            if args.is_empty() {
                return Err(Error::command("usage: /model <model-id>"));
            }
            Ok(SlashCommand::Model(args.join(" ")))
        }
        "stream" => match args {
            [value] if value.eq_ignore_ascii_case("on") => Ok(SlashCommand::Stream(true)),
            [value] if value.eq_ignore_ascii_case("off") => Ok(SlashCommand::Stream(false)),
            _ => Err(Error::command("usage: /stream on|off")),
        },
        // Paths containing spaces are rejoined.
        "save" if args.is_empty() => Ok(SlashCommand::Save(None)),
        "save" => Ok(SlashCommand::Save(Some(args.join(" ")))),
        _ => Err(Error::command(format!(
            "unknown command {:?}. Use /help",
            fields[0]
        ))),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Commands:
  /help                Show available commands
  /model <model-id>    Change model for next requests
  /stream on|off       Toggle streaming mode
  /reset               Reset conversation history (keeps system prompt)
  /save [path]         Save transcript to JSON
  /exit                Exit chat"#
}
