//! The interactive read-eval-print loop.
//!
//! [`run`] reads one line at a time and either dispatches a slash command or runs a chat
//! turn. The mutable settings a user can change mid-chat live in an explicit
//! [`RuntimeState`] owned by the loop; the [`Session`] is likewise owned by the loop and only
//! borrowed by the request runner.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::commands::{SlashCommand, help_text, parse_command};
use crate::chat::completion::{ChatClient, RequestOptions};
use crate::chat::config::ChatConfig;
use crate::chat::input::{LineReader, ReadLine};
use crate::chat::interrupt::Interrupts;
use crate::chat::runner::run_with_interrupt;
use crate::chat::session::Session;
use crate::chat::transcript::{Transcript, TranscriptMeta};
use crate::client::CompletionTransport;
use crate::error::Result;
use crate::observability::{CHAT_TURN_FAILURES, CHAT_TURNS};
use crate::render::Renderer;

/// Prompt shown before each line of input.
pub const PROMPT: &str = "you> ";

/// File name used by `/save` when no path is given or remembered.
pub const DEFAULT_SAVE_PATH: &str = "gonkagate-chat-history.json";

/// Settings the user can change while chatting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeState {
    /// Model for the next turn.
    pub model: String,
    /// Whether the next turn streams.
    pub stream: bool,
    /// Last path a transcript was saved to, or the launch `--save` path.
    pub save_path: Option<PathBuf>,
    /// Whether to save when the loop ends.
    pub auto_save: bool,
}

impl RuntimeState {
    /// Initial state from the launch configuration.
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            model: config.model.clone(),
            stream: config.stream,
            save_path: config.save_path.clone(),
            auto_save: config.save_path.is_some(),
        }
    }
}

/// What the loop does after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Leave the loop.
    Exit,
}

/// Run the chat until `/exit` or end of input.
///
/// Turn-level failures are reported through `renderer` and never end the loop. Input errors
/// and a failed auto-save at the end are returned.
pub async fn run<T: CompletionTransport>(
    config: &ChatConfig,
    client: &ChatClient<T>,
    interrupts: &Interrupts,
    input: &mut dyn LineReader,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    let mut session = Session::new(&config.system_prompt);
    let mut state = RuntimeState::from_config(config);
    let root = CancellationToken::new();
    info!(model = %state.model, stream = state.stream, "chat started");

    renderer.print_info("Interactive chat started. Type /help for commands.");

    loop {
        let line = match input.read_line(PROMPT)? {
            ReadLine::Line(line) => line,
            ReadLine::Interrupted => continue,
            ReadLine::Eof => {
                renderer.print_info("Input closed. Exiting chat.");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        input.add_history(line);

        if line.starts_with('/') {
            let flow = match parse_command(line) {
                Ok(command) => handle_command(command, config, &mut state, &mut session, renderer),
                Err(err) => Err(err),
            };
            match flow {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(err) => renderer.print_error(&err.friendly_message()),
            }
            continue;
        }

        chat_turn(
            line,
            config,
            &state,
            &mut session,
            client,
            &root,
            interrupts,
            renderer,
        )
        .await;
    }

    if state.auto_save {
        if let Some(path) = &state.save_path {
            save_session(path, config, &state, &session)?;
            renderer.print_info(&format!("History saved to {}", path.display()));
        }
    }
    info!("chat ended");
    Ok(())
}

/// Apply one parsed command.
///
/// A failed `/save` is returned as an error; the loop reports it and carries on.
pub fn handle_command(
    command: SlashCommand,
    config: &ChatConfig,
    state: &mut RuntimeState,
    session: &mut Session,
    renderer: &mut dyn Renderer,
) -> Result<Flow> {
    debug!(command = command.name(), argument = command.argument(), "slash command");
    match command {
        SlashCommand::Help => renderer.print_text(help_text()),
        SlashCommand::Model(model) => {
            state.model = model.trim().to_string();
            renderer.print_info(&format!("Model set to {}", state.model));
        }
        SlashCommand::Stream(stream) => {
            state.stream = stream;
            renderer.print_info(&format!("Streaming set to {stream}"));
        }
        SlashCommand::Reset => {
            session.reset();
            renderer.print_info("Conversation reset.");
        }
        SlashCommand::Save(path) => {
            let path = path
                .map(PathBuf::from)
                .or_else(|| state.save_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_PATH));
            save_session(&path, config, state, session)?;
            renderer.print_info(&format!("History saved to {}", path.display()));
            state.save_path = Some(path);
        }
        SlashCommand::Exit => {
            renderer.print_info("Exiting chat.");
            return Ok(Flow::Exit);
        }
    }
    Ok(Flow::Continue)
}

#[allow(clippy::too_many_arguments)]
async fn chat_turn<T: CompletionTransport>(
    line: &str,
    config: &ChatConfig,
    state: &RuntimeState,
    session: &mut Session,
    client: &ChatClient<T>,
    root: &CancellationToken,
    interrupts: &Interrupts,
    renderer: &mut dyn Renderer,
) {
    CHAT_TURNS.click();
    session.add_user(line);
    renderer.print_assistant_prefix();

    let options = RequestOptions {
        model: state.model.clone(),
        temperature: config.temperature,
        stream: state.stream,
    };
    let messages = session.messages();
    match run_with_interrupt(client, &messages, &options, root, interrupts, renderer).await {
        Ok(answer) => {
            if options.stream {
                renderer.newline();
            } else {
                renderer.print_text(&answer);
            }
            session.add_assistant(&answer);
        }
        Err(err) => {
            CHAT_TURN_FAILURES.click();
            warn!(error = %err, "chat turn failed");
            session.remove_last_user_if_present();
            // The interrupt notice already ended the assistant line; `root` is never
            // canceled, so these kinds only come from an interrupt.
            if !(err.is_cancellation() || err.is_interrupted()) {
                renderer.newline();
            }
            renderer.print_error(&err.friendly_message());
        }
    }
}

fn save_session(
    path: &Path,
    config: &ChatConfig,
    state: &RuntimeState,
    session: &Session,
) -> Result<()> {
    let meta = TranscriptMeta {
        model: state.model.clone(),
        base_url: config.base_url.clone(),
        streaming: state.stream,
        temperature: config.temperature,
        system_prompt: session.system_prompt().to_string(),
    };
    Transcript::capture(session, meta).save(path)
}
