//! Interactive chat with models served by GonkaGate.
//!
//! This binary provides a REPL over the OpenAI-compatible Chat Completions API.
//!
//! # Usage
//!
//! ```bash
//! # The API key and model come from the environment
//! export GONKAGATE_API_KEY=...
//! export GONKAGATE_MODEL=...
//! gonkagate-chat
//!
//! # Batch answers, a custom system prompt, and a transcript written on exit
//! gonkagate-chat --stream false --system "You are a helpful coding assistant" --save chat.json
//!
//! # Validate the configuration without contacting the server
//! gonkagate-chat --smoke
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/model <model-id>` - Change the model
//! - `/stream on|off` - Toggle streaming
//! - `/reset` - Clear the conversation
//! - `/save [path]` - Save the transcript
//! - `/exit` - Exit the application
//!
//! Ctrl-C while an answer is being generated cancels that answer only; otherwise it exits.

use arrrg::CommandLine;
use tracing_subscriber::EnvFilter;

use gonkagate_chat::OpenAi;
use gonkagate_chat::chat::{
    ChatArgs, ChatClient, ChatConfig, Interrupts, PlainTextRenderer, RustylineReader,
    SMOKE_MESSAGE, base_url_override_warning, run,
};

/// Main entry point for the gonkagate-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("gonkagate-chat [OPTIONS]");
    let config = ChatConfig::from_env(args)?;
    if let Some(warning) = base_url_override_warning(|name| std::env::var(name).ok()) {
        eprintln!("{warning}");
    }
    tracing::debug!(?config, "configuration resolved");

    if config.smoke {
        println!("{SMOKE_MESSAGE}");
        return Ok(());
    }

    let client = ChatClient::new(OpenAi::new(config.api_key.clone(), &config.base_url)?);
    let interrupts = Interrupts::new();
    interrupts.install_ctrlc()?;
    let mut input = RustylineReader::new()?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    run(&config, &client, &interrupts, &mut input, &mut renderer).await?;
    Ok(())
}
