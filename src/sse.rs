//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module converts the raw byte stream of a streamed chat completion into a stream of
//! [`ChatCompletionChunk`] values. OpenAI-compatible servers send one `data: <json>` line per
//! event and finish with `data: [DONE]`.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::observability::{STREAM_CHUNKS, STREAM_ERRORS};
use crate::types::ChatCompletionChunk;
use crate::{Error, Result};

/// Marker payload that terminates an OpenAI stream.
const DONE_MARKER: &str = "[DONE]";

/// Process a stream of bytes into a stream of chat completion chunks.
///
/// The returned stream ends at the `[DONE]` marker or when the byte stream ends. Transport
/// errors, malformed payloads and in-band error objects are yielded as `Err` items.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<ChatCompletionChunk>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    // Convert transport errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer = String::new();
    let pending = Vec::new();

    stream::unfold(
        (stream, buffer, pending, false),
        move |(mut stream, mut buffer, mut pending, done)| async move {
            if done {
                return None;
            }
            loop {
                // First check if we have a complete event in the buffer
                match extract_event(&mut buffer) {
                    Some(Event::Done) => return None,
                    Some(Event::Chunk(result)) => {
                        count(&result);
                        return Some((result, (stream, buffer, pending, false)));
                    }
                    Some(Event::Skip) => continue,
                    None => {}
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        pending.extend_from_slice(&bytes);
                        if let Err(err) = decode_utf8(&mut pending, &mut buffer) {
                            STREAM_ERRORS.click();
                            return Some((Err(err), (stream, buffer, pending, true)));
                        }
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer, pending, true)));
                    }
                    None => {
                        if !pending.is_empty() {
                            STREAM_ERRORS.click();
                            let err = Error::encoding(
                                "Invalid UTF-8 in stream: truncated character at end of stream",
                                None,
                            );
                            return Some((Err(err), (stream, buffer, pending, true)));
                        }
                        // End of stream; a final event may lack its blank line
                        if !buffer.trim().is_empty() {
                            buffer.push_str("\n\n");
                            if let Some(Event::Chunk(result)) = extract_event(&mut buffer) {
                                count(&result);
                                return Some((result, (stream, buffer, pending, true)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Move the decodable prefix of `pending` onto `buffer`.
///
/// Network chunks split characters at arbitrary byte offsets, so an incomplete sequence at
/// the end stays in `pending` until the next chunk arrives.
fn decode_utf8(pending: &mut Vec<u8>, buffer: &mut String) -> Result<()> {
    let valid = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(e) => {
            return Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            ));
        }
    };
    let tail = pending.split_off(valid);
    let text = String::from_utf8(std::mem::replace(pending, tail)).map_err(|e| {
        Error::encoding(format!("Invalid UTF-8 in stream: {e}"), Some(Box::new(e)))
    })?;
    buffer.push_str(&text);
    Ok(())
}

fn count(result: &Result<ChatCompletionChunk>) {
    match result {
        Ok(_) => STREAM_CHUNKS.click(),
        Err(_) => STREAM_ERRORS.click(),
    }
}

enum Event {
    Chunk(Result<ChatCompletionChunk>),
    Done,
    Skip,
}

/// Extract one complete SSE event from the front of the buffer.
///
/// Events are delimited by a blank line. Comment lines (`:`) and fields other than `data`
/// are ignored; multiple `data` lines are joined with newlines.
fn extract_event(buffer: &mut String) -> Option<Event> {
    if buffer.contains("\r\n") {
        *buffer = buffer.replace("\r\n", "\n");
    }
    let end = buffer.find("\n\n")?;
    let event_text: String = buffer.drain(..end + 2).collect();

    let mut data: Option<String> = None;
    for line in event_text.lines() {
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }

    let Some(data) = data else {
        return Some(Event::Skip);
    };
    let data = data.trim();
    if data.is_empty() {
        return Some(Event::Skip);
    }
    if data == DONE_MARKER {
        return Some(Event::Done);
    }
    Some(Event::Chunk(parse_chunk(data)))
}

/// Parse the payload of a `data:` field.
fn parse_chunk(data: &str) -> Result<ChatCompletionChunk> {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
    }

    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(data) {
        let message = envelope
            .error
            .message
            .unwrap_or_else(|| "stream reported an error".to_string());
        return Err(Error::streaming(message, None));
    }

    serde_json::from_str::<ChatCompletionChunk>(data).map_err(|e| {
        Error::serialization(
            format!("Failed to parse stream chunk: {e}"),
            Some(Box::new(e)),
        )
    })
}
