use serde::{Deserialize, Serialize};

/// A complete (non-streamed) chat completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Unique identifier of the completion.
    #[serde(default)]
    pub id: String,

    /// The model that produced the completion.
    #[serde(default)]
    pub model: String,

    /// Candidate answers; the first one is used.
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

/// One candidate answer in a [`ChatCompletion`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice {
    /// Position of this choice in the response.
    #[serde(default)]
    pub index: u32,

    /// The generated message.
    pub message: CompletionMessage,

    /// Why generation stopped, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The message inside a [`CompletionChoice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMessage {
    /// Role reported by the server, normally `assistant`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Generated text; `null` is treated as empty.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletion {
    /// Returns the content of the first choice, if there is one.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_deref().unwrap_or_default())
    }
}
