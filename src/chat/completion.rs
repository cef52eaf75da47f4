//! Completion client adapter.
//!
//! [`ChatClient`] turns a conversation into one request against a [`CompletionTransport`]
//! and reduces the answer to plain text. Every await on the transport races the caller's
//! [`CancellationToken`]; when the token fires the in-flight future is dropped, which aborts
//! the underlying HTTP request.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::chat::message::Message;
use crate::client::CompletionTransport;
use crate::error::{Error, Result};
use crate::observability::STREAM_DELTAS;
use crate::types::{ChatCompletionRequest, ChatMessageParam};

/// Per-turn request settings.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOptions {
    /// The model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Whether to stream the answer.
    pub stream: bool,
}

/// Adapter from the conversation model to a completion transport.
pub struct ChatClient<T: CompletionTransport> {
    transport: T,
}

impl<T: CompletionTransport> ChatClient<T> {
    /// Wrap a transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Returns the wrapped transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Unwrap the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Run one completion and return the assistant's answer.
    ///
    /// When streaming, `on_token` is called synchronously for every non-empty delta, in
    /// arrival order, before the next delta is requested. The returned text is trimmed.
    pub async fn complete(
        &self,
        messages: &[Message],
        options: &RequestOptions,
        cancel: &CancellationToken,
        mut on_token: Option<&mut (dyn FnMut(&str) + Send)>,
    ) -> Result<String> {
        let params = to_params(messages);
        if params.is_empty() {
            return Err(Error::validation("no messages to send", None));
        }

        let request = ChatCompletionRequest::new(options.model.trim(), params)
            .with_temperature(options.temperature)
            .with_stream(options.stream);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "sending chat completion request"
        );

        if !options.stream {
            let completion = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::cancelled("request canceled")),
                completion = self.transport.send(request) => completion?,
            };
            let Some(content) = completion.first_content() else {
                return Err(Error::empty_response("received a response with no choices"));
            };
            let content = content.trim();
            if content.is_empty() {
                return Err(Error::empty_response(
                    "received a response with empty message content",
                ));
            }
            return Ok(content.to_string());
        }

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::cancelled("request canceled")),
            stream = self.transport.stream(request) => stream?,
        };

        let mut answer = String::new();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::cancelled("request canceled")),
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else {
                break;
            };
            let chunk = chunk?;
            let Some(delta) = chunk.delta_text() else {
                continue;
            };
            STREAM_DELTAS.click();
            answer.push_str(delta);
            if let Some(on_token) = on_token.as_deref_mut() {
                on_token(delta);
            }
        }

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(Error::empty_response(
                "received a streaming response with empty content",
            ));
        }
        Ok(answer.to_string())
    }
}

/// Translate the conversation, dropping blank messages.
fn to_params(messages: &[Message]) -> Vec<ChatMessageParam> {
    messages.iter().filter_map(Message::to_param).collect()
}
