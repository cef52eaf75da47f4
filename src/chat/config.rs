//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the validated launch
//! configuration, resolved from flags and the environment.

use std::fmt;
use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::chat::session::DEFAULT_SYSTEM_PROMPT;
use crate::client::DEFAULT_BASE_URL;
use crate::error::{Error, Result};

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Highest accepted sampling temperature.
const MAX_TEMPERATURE: f64 = 2.0;

/// Environment variables consulted for the API key, in order.
const API_KEY_VARS: [&str; 2] = ["GONKAGATE_API_KEY", "OPENAI_API_KEY"];

/// Environment variable consulted for the model when `--model` is absent.
const MODEL_VAR: &str = "GONKAGATE_MODEL";

/// Environment variables that would override the base URL elsewhere; ignored here.
const BASE_URL_VARS: [&str; 2] = ["GONKAGATE_BASE_URL", "OPENAI_BASE_URL"];

/// Printed by `--smoke` once the configuration has been validated.
pub const SMOKE_MESSAGE: &str = "Smoke check passed: config is valid and command can start.";

/// Command-line arguments for the gonkagate-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model ID override. Uses GONKAGATE_MODEL when empty.", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt override.", "PROMPT")]
    pub system: Option<String>,

    /// Path the transcript is saved to when the chat ends.
    #[arrrg(optional, "Auto-save conversation history on exit to this path.", "PATH")]
    pub save: Option<String>,

    /// Whether to stream answers.
    #[arrrg(optional, "Enable streaming output: true or false (default: true)", "BOOL")]
    pub stream: Option<String>,

    /// Sampling temperature.
    #[arrrg(optional, "Temperature between 0 and 2 (default: 0.2)", "TEMP")]
    pub temperature: Option<String>,

    /// Validate configuration and exit.
    #[arrrg(flag, "Validate startup and configuration without network requests.")]
    pub smoke: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Validated launch configuration.
#[derive(Clone, PartialEq)]
pub struct ChatConfig {
    /// Bearer token for the completion endpoint.
    pub api_key: String,

    /// Base URL of the completion endpoint.
    pub base_url: String,

    /// Model used until `/model` changes it.
    pub model: String,

    /// Whether answers stream until `/stream` changes it.
    pub stream: bool,

    /// System prompt heading the conversation.
    pub system_prompt: String,

    /// Where the transcript is saved when the chat ends, if anywhere.
    pub save_path: Option<PathBuf>,

    /// Sampling temperature for every request.
    pub temperature: f64,

    /// Validate and exit without starting the chat.
    pub smoke: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Resolve the configuration from arguments and the process environment.
    pub fn from_env(args: ChatArgs) -> Result<Self> {
        Self::resolve(args, |name| std::env::var(name).ok())
    }

    /// Resolve the configuration from arguments and an environment lookup.
    pub fn resolve(args: ChatArgs, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let stream = parse_stream(args.stream.as_deref())?;
        let temperature = parse_temperature(args.temperature.as_deref())?;

        let api_key = first_non_empty(API_KEY_VARS.into_iter().map(|name| lookup(name)))
            .ok_or_else(|| {
                Error::configuration(
                    "missing API key. Set GONKAGATE_API_KEY (recommended) or OPENAI_API_KEY",
                )
            })?;

        let model = first_non_empty([args.model.clone(), lookup(MODEL_VAR)]).ok_or_else(|| {
            Error::configuration("missing model. Set GONKAGATE_MODEL or pass --model")
        })?;

        let system_prompt = args
            .system
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
            .to_string();

        let save_path = args
            .save
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(ChatConfig {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            stream,
            system_prompt,
            save_path,
            temperature,
            smoke: args.smoke,
            use_color: !args.no_color,
        })
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("stream", &self.stream)
            .field("system_prompt", &self.system_prompt)
            .field("save_path", &self.save_path)
            .field("temperature", &self.temperature)
            .field("smoke", &self.smoke)
            .field("use_color", &self.use_color)
            .finish()
    }
}

/// Returns a warning when a base URL override is present in the environment.
pub fn base_url_override_warning(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    first_non_empty(BASE_URL_VARS.into_iter().map(|name| lookup(name)))?;
    Some(format!(
        "Warning: GONKAGATE_BASE_URL and OPENAI_BASE_URL are ignored. Base URL is fixed to {DEFAULT_BASE_URL}."
    ))
}

fn first_non_empty(values: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    values
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn parse_stream(raw: Option<&str>) -> Result<bool> {
    let value = raw.map(str::trim).unwrap_or_default();
    match value {
        "" => Ok(true),
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(Error::configuration(format!(
            "invalid --stream value {:?}: expected true or false",
            raw.unwrap_or_default()
        ))),
    }
}

fn parse_temperature(raw: Option<&str>) -> Result<f64> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_TEMPERATURE);
    };
    let temperature: f64 = raw.parse().map_err(|_| {
        Error::configuration(format!(
            "invalid --temperature value {raw:?}: expected a number"
        ))
    })?;
    if !temperature.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(Error::configuration(format!(
            "invalid temperature {temperature:.2}: expected value between 0 and 2"
        )));
    }
    Ok(temperature)
}
