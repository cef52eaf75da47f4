//! Conversation state for one chat.
//!
//! A [`Session`] owns the ordered list of messages sent with every request. The system
//! prompt is always the first message; nothing but [`Session::reset`] touches it, and reset
//! reinstates it unchanged.

use crate::chat::message::{Message, Role};

/// The system prompt used when none (or a blank one) is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a concise assistant.";

/// The ordered conversation history, headed by the system prompt.
#[derive(Clone, Debug)]
pub struct Session {
    system_prompt: String,
    messages: Vec<Message>,
}

impl Session {
    /// Create a session whose history holds only the system prompt.
    pub fn new(system_prompt: &str) -> Self {
        let system_prompt = match system_prompt.trim() {
            "" => DEFAULT_SYSTEM_PROMPT.to_string(),
            prompt => prompt.to_string(),
        };
        let messages = vec![Message::new(Role::System, system_prompt.clone())];
        Self {
            system_prompt,
            messages,
        }
    }

    /// The system prompt this session was created with.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Append a user turn. Blank text is ignored.
    pub fn add_user(&mut self, text: &str) {
        self.push(Role::User, text);
    }

    /// Append an assistant turn. Blank text is ignored.
    pub fn add_assistant(&mut self, text: &str) {
        self.push(Role::Assistant, text);
    }

    fn push(&mut self, role: Role, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.messages.push(Message::new(role, text));
    }

    /// Remove the last message if and only if it is a user turn.
    ///
    /// Returns whether a message was removed.
    pub fn remove_last_user_if_present(&mut self) -> bool {
        match self.messages.last() {
            Some(message) if message.role == Role::User => {
                self.messages.pop();
                true
            }
            _ => false,
        }
    }

    /// Drop all turns, keeping only the original system prompt.
    pub fn reset(&mut self) {
        self.messages = vec![Message::new(Role::System, self.system_prompt.clone())];
    }

    /// Returns a copy of the history, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Number of messages, including the system prompt.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: the system prompt is always present.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
