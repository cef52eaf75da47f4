//! Interactive chat against an OpenAI-compatible completion endpoint.
//!
//! This module provides the REPL engine used by the `gonkagate-chat` binary. It supports:
//!
//! - Streamed or batched answers, switchable mid-chat
//! - Slash commands for session control
//! - Ctrl-C to cancel the answer in progress without leaving the chat
//! - Saving the transcript as JSON, on demand and when the chat ends
//!
//! # Architecture
//!
//! - [`session`]: the conversation history, headed by the system prompt
//! - [`commands`]: slash command parsing and help text
//! - [`completion`]: adapter from the conversation to a completion transport
//! - [`interrupt`] and [`runner`]: racing one request against user interrupts
//! - [`repl`]: the read-eval-print loop and command dispatcher
//! - [`config`]: CLI arguments and environment resolution
//! - [`transcript`]: the persisted JSON form
//! - [`input`]: line input

pub mod commands;
pub mod completion;
pub mod config;
pub mod input;
pub mod interrupt;
pub mod message;
pub mod repl;
pub mod runner;
pub mod session;
pub mod transcript;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{SlashCommand, help_text, parse_command};
pub use completion::{ChatClient, RequestOptions};
pub use config::{ChatArgs, ChatConfig, SMOKE_MESSAGE, base_url_override_warning};
pub use input::{LineReader, ReadLine, RustylineReader};
pub use interrupt::Interrupts;
pub use message::{Message, Role};
pub use repl::{DEFAULT_SAVE_PATH, Flow, PROMPT, RuntimeState, handle_command, run};
pub use runner::run_with_interrupt;
pub use session::{DEFAULT_SYSTEM_PROMPT, Session};
pub use transcript::{Transcript, TranscriptMessage, TranscriptMeta};
