//! Newline delimited JSON framing for [`Message`]s.
//!
//! Every message is one JSON object followed by a single `\n`. The decoder works
//! on a caller owned buffer that reads are appended to, so a buffer may hold half
//! a message, several messages, or both. The codec keeps no state of its own.

use crate::Message;
use thiserror::Error;

pub const DELIMITER: u8 = b'\n';

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("line is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("line is not a valid message: {0}")]
    InvalidMessage(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
#[error("failed to encode {kind} message: {source}")]
pub struct EncodeError {
    kind: &'static str,
    #[source]
    source: serde_json::Error,
}

/// Serializes a message and appends the delimiter.
pub fn encode(message: &Message) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = serde_json::to_vec(message).map_err(|source| EncodeError {
        kind: message.kind(),
        source,
    })?;
    bytes.push(DELIMITER);
    Ok(bytes)
}

/// Takes the next complete line off the front of `buffer` and decodes it.
///
/// Blank lines are consumed and skipped. Returns `None` once no complete line is
/// left; any trailing partial message stays in the buffer for the next read. A
/// malformed line is consumed too, so the caller can drop the error and keep
/// calling.
pub fn decode_next(buffer: &mut Vec<u8>) -> Option<Result<Message, DecodeError>> {
    loop {
        let end = buffer.iter().position(|&b| b == DELIMITER)?;
        let line: Vec<u8> = buffer.drain(..=end).collect();
        let text = match std::str::from_utf8(&line[..end]) {
            Ok(text) => text.trim(),
            Err(e) => return Some(Err(e.into())),
        };
        if text.is_empty() {
            continue;
        }
        return Some(serde_json::from_str(text).map_err(DecodeError::from));
    }
}

/// Decodes every complete line in `buffer`, discarding malformed ones.
pub fn decode_all(buffer: &mut Vec<u8>) -> Vec<Message> {
    let mut messages = Vec::new();
    while let Some(result) = decode_next(buffer) {
        if let Ok(message) = result {
            messages.push(message);
        }
    }
    messages
}
