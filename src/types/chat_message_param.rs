use serde::{Deserialize, Serialize};

/// A message as sent to the Chat Completions endpoint.
///
/// The wire form is `{"role": "...", "content": "..."}`; the role selects the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessageParam {
    /// Instructions that frame the whole conversation.
    System {
        /// The message text.
        content: String,
    },
    /// A turn written by the user.
    User {
        /// The message text.
        content: String,
    },
    /// A turn previously produced by the model.
    Assistant {
        /// The message text.
        content: String,
    },
}

impl ChatMessageParam {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
        }
    }

    /// Returns the wire name of the role.
    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
        }
    }

    /// Returns the message text.
    pub fn content(&self) -> &str {
        match self {
            Self::System { content } | Self::User { content } | Self::Assistant { content } => {
                content
            }
        }
    }
}
