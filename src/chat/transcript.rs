//! Transcript persistence.
//!
//! A transcript is a pretty-printed JSON snapshot of the conversation plus the settings it
//! ran with:
//!
//! ```json
//! {
//!   "saved_at": "2024-05-01T12:00:00Z",
//!   "meta": {"model": "...", "base_url": "...", "streaming": true, "temperature": 0.2,
//!            "system_prompt": "..."},
//!   "messages": [{"role": "system", "content": "..."}]
//! }
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};
use time::OffsetDateTime;
use tracing::debug;

use crate::chat::message::{Message, Role};
use crate::chat::session::Session;
use crate::error::{Error, Result};
use crate::observability::{TRANSCRIPT_SAVE_ERRORS, TRANSCRIPT_SAVES};
use crate::utils::time::now_utc_seconds;

/// Settings recorded alongside the messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMeta {
    /// Model in use when the transcript was saved.
    pub model: String,
    /// Endpoint the conversation ran against.
    pub base_url: String,
    /// Whether streaming was on when the transcript was saved.
    pub streaming: bool,
    /// Sampling temperature.
    pub temperature: f64,
    /// The session's system prompt.
    pub system_prompt: String,
}

/// One persisted message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    /// Role name as sent on the wire.
    pub role: String,
    /// Message text.
    pub content: String,
}

/// A saved conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// When the transcript was written, UTC, whole seconds.
    #[serde(with = "crate::utils::time")]
    pub saved_at: OffsetDateTime,
    /// Settings at save time.
    pub meta: TranscriptMeta,
    /// The conversation, oldest first.
    pub messages: Vec<TranscriptMessage>,
}

impl Transcript {
    /// Snapshot a session, stamped with the current time.
    pub fn capture(session: &Session, meta: TranscriptMeta) -> Self {
        let messages = session
            .messages()
            .into_iter()
            .map(|message| TranscriptMessage {
                role: message.role.to_string(),
                content: message.content,
            })
            .collect();
        Self {
            saved_at: now_utc_seconds(),
            meta,
            messages,
        }
    }

    /// Write the transcript as pretty JSON with a trailing newline.
    ///
    /// Missing parent directories are created.
    pub fn save(&self, path: &Path) -> Result<()> {
        let result = self.write(path);
        match &result {
            Ok(()) => {
                TRANSCRIPT_SAVES.click();
                debug!(path = %path.display(), messages = self.messages.len(), "transcript saved");
            }
            Err(err) => {
                TRANSCRIPT_SAVE_ERRORS.click();
                debug!(path = %path.display(), error = %err, "transcript save failed");
            }
        }
        result
    }

    fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::io(
                    format!("save history: create save directory {}: {e}", parent.display()),
                    e,
                )
            })?;
        }

        let file = File::create(path).map_err(|e| {
            Error::io(format!("save history: write transcript {}: {e}", path.display()), e)
        })?;
        let mut writer = BufWriter::new(file);
        to_writer_pretty(&mut writer, self).map_err(|e| {
            Error::serialization(
                format!("save history: marshal transcript: {e}"),
                Some(Box::new(e)),
            )
        })?;
        writer
            .write_all(b"\n")
            .and_then(|()| writer.flush())
            .map_err(|e| {
                Error::io(format!("save history: write transcript {}: {e}", path.display()), e)
            })
    }

    /// Read a transcript previously written by [`Transcript::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::io(format!("read transcript {}: {e}", path.display()), e))?;
        from_reader(BufReader::new(file)).map_err(|e| {
            Error::serialization(
                format!("parse transcript {}: {e}", path.display()),
                Some(Box::new(e)),
            )
        })
    }

    /// Rebuild the conversation; roles are parsed leniently.
    pub fn to_messages(&self) -> Vec<Message> {
        self.messages
            .iter()
            .map(|message| Message::new(Role::from(message.role.as_str()), message.content.clone()))
            .collect()
    }
}
