//! Conversation roles and messages.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ChatMessageParam;

/// The author of a message in the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    /// The system prompt.
    System,
    /// The person at the keyboard.
    User,
    /// The model.
    Assistant,
}

impl Role {
    /// Returns the wire name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient role parsing: unrecognized roles are treated as user messages.
impl From<&str> for Role {
    fn from(role: &str) -> Self {
        let role = role.trim();
        if role.eq_ignore_ascii_case("system") {
            Role::System
        } else if role.eq_ignore_ascii_case("assistant") {
            Role::Assistant
        } else {
            Role::User
        }
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        Role::from(role.as_str())
    }
}

/// One entry of the conversation.
///
/// Content is trimmed and never empty when the message comes from a [`Session`] or a loaded
/// transcript.
///
/// [`Session`]: crate::chat::Session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,
    /// The text of the message.
    pub content: String,
}

impl Message {
    pub(crate) fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Convert to the wire representation, or `None` if the content is blank.
    pub fn to_param(&self) -> Option<ChatMessageParam> {
        let content = self.content.trim();
        if content.is_empty() {
            return None;
        }
        Some(match self.role {
            Role::System => ChatMessageParam::system(content),
            Role::Assistant => ChatMessageParam::assistant(content),
            Role::User => ChatMessageParam::user(content),
        })
    }
}
