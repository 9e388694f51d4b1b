//! Decoder for the `application/vnd.amazon.eventstream` binary framing used by
//! streaming Bedrock responses.
//!
//! Each message is laid out as:
//!
//! ```text
//! [total length u32][headers length u32][prelude crc u32][headers][payload][message crc u32]
//! ```
//!
//! All integers are big-endian. Both checksums are CRC-32 over the bytes preceding them.

use crate::error::{AssistantError, Result};
use std::collections::HashMap;

const PRELUDE_LEN: usize = 12;
const CRC_LEN: usize = 4;
const MIN_MESSAGE_LEN: usize = PRELUDE_LEN + CRC_LEN;
const MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

// Header value type tags
const HEADER_BOOL_TRUE: u8 = 0;
const HEADER_BOOL_FALSE: u8 = 1;
const HEADER_BYTE: u8 = 2;
const HEADER_SHORT: u8 = 3;
const HEADER_INT: u8 = 4;
const HEADER_LONG: u8 = 5;
const HEADER_BYTES: u8 = 6;
const HEADER_STRING: u8 = 7;
const HEADER_TIMESTAMP: u8 = 8;
const HEADER_UUID: u8 = 9;

/// One decoded event-stream message.
///
/// Only string-valued headers are kept; those are the ones that carry the event and
/// message types.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMessage {
    pub headers: HashMap<String, String>,
    pub payload: Vec<u8>,
}

impl EventMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn event_type(&self) -> Option<&str> {
        self.header(":event-type")
    }

    pub fn message_type(&self) -> Option<&str> {
        self.header(":message-type")
    }
}

/// Incremental decoder: push response bytes as they arrive, then drain whole messages.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: Vec<u8>,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes received but not yet decoded into a message
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Decode the next complete message, or `None` if more bytes are needed
    pub fn next_message(&mut self) -> Result<Option<EventMessage>> {
        if self.buffer.len() < PRELUDE_LEN {
            return Ok(None);
        }

        let total_len = read_u32(&self.buffer, 0) as usize;
        let headers_len = read_u32(&self.buffer, 4) as usize;
        let prelude_crc = read_u32(&self.buffer, 8);

        let computed = crc32fast::hash(&self.buffer[..8]);
        if computed != prelude_crc {
            return Err(AssistantError::EventStreamError(format!(
                "prelude checksum mismatch (expected {:#010x}, computed {:#010x})",
                prelude_crc, computed
            )));
        }
        if !(MIN_MESSAGE_LEN..=MAX_MESSAGE_LEN).contains(&total_len) {
            return Err(AssistantError::EventStreamError(format!(
                "invalid message length {}",
                total_len
            )));
        }
        if headers_len > total_len - MIN_MESSAGE_LEN {
            return Err(AssistantError::EventStreamError(format!(
                "headers length {} exceeds message length {}",
                headers_len, total_len
            )));
        }

        if self.buffer.len() < total_len {
            return Ok(None);
        }

        let frame: Vec<u8> = self.buffer.drain(..total_len).collect();
        let crc_offset = total_len - CRC_LEN;
        let message_crc = read_u32(&frame, crc_offset);
        let computed = crc32fast::hash(&frame[..crc_offset]);
        if computed != message_crc {
            return Err(AssistantError::EventStreamError(format!(
                "message checksum mismatch (expected {:#010x}, computed {:#010x})",
                message_crc, computed
            )));
        }

        let headers_end = PRELUDE_LEN + headers_len;
        let headers = decode_headers(&frame[PRELUDE_LEN..headers_end])?;
        let payload = frame[headers_end..crc_offset].to_vec();

        Ok(Some(EventMessage { headers, payload }))
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_be_bytes(word)
}

fn decode_headers(mut bytes: &[u8]) -> Result<HashMap<String, String>> {
    let mut headers = HashMap::new();

    while !bytes.is_empty() {
        let name_len = bytes[0] as usize;
        let name_bytes = take(&mut bytes, 1 + name_len)?;
        let name = String::from_utf8_lossy(&name_bytes[1..]).into_owned();

        let value_type = take(&mut bytes, 1)?[0];
        match value_type {
            HEADER_BOOL_TRUE | HEADER_BOOL_FALSE => {}
            HEADER_BYTE => {
                take(&mut bytes, 1)?;
            }
            HEADER_SHORT => {
                take(&mut bytes, 2)?;
            }
            HEADER_INT => {
                take(&mut bytes, 4)?;
            }
            HEADER_LONG | HEADER_TIMESTAMP => {
                take(&mut bytes, 8)?;
            }
            HEADER_UUID => {
                take(&mut bytes, 16)?;
            }
            HEADER_BYTES | HEADER_STRING => {
                let len_bytes = take(&mut bytes, 2)?;
                let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
                let value = take(&mut bytes, len)?;
                if value_type == HEADER_STRING {
                    headers.insert(name, String::from_utf8_lossy(value).into_owned());
                }
            }
            other => {
                return Err(AssistantError::EventStreamError(format!(
                    "unknown header value type {} for '{}'",
                    other, name
                )));
            }
        }
    }

    Ok(headers)
}

fn take<'a>(bytes: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    if bytes.len() < len {
        return Err(AssistantError::EventStreamError("truncated header".to_string()));
    }
    let (head, tail) = bytes.split_at(len);
    *bytes = tail;
    Ok(head)
}

/// Encode a message with string headers. Used to build response bodies in tests.
#[cfg(test)]
pub(crate) fn encode_message(headers: &[(&str, &str)], payload: &[u8]) -> Vec<u8> {
    let mut header_bytes = Vec::new();
    for (name, value) in headers {
        header_bytes.push(name.len() as u8);
        header_bytes.extend_from_slice(name.as_bytes());
        header_bytes.push(HEADER_STRING);
        header_bytes.extend_from_slice(&(value.len() as u16).to_be_bytes());
        header_bytes.extend_from_slice(value.as_bytes());
    }

    let total_len = PRELUDE_LEN + header_bytes.len() + payload.len() + CRC_LEN;
    let mut message = Vec::with_capacity(total_len);
    message.extend_from_slice(&(total_len as u32).to_be_bytes());
    message.extend_from_slice(&(header_bytes.len() as u32).to_be_bytes());
    let prelude_crc = crc32fast::hash(&message);
    message.extend_from_slice(&prelude_crc.to_be_bytes());
    message.extend_from_slice(&header_bytes);
    message.extend_from_slice(payload);
    let message_crc = crc32fast::hash(&message);
    message.extend_from_slice(&message_crc.to_be_bytes());
    message
}

/// Encode a Bedrock-style event message with a JSON payload
#[cfg(test)]
pub(crate) fn encode_event(event_type: &str, payload: &serde_json::Value) -> Vec<u8> {
    encode_message(
        &[
            (":event-type", event_type),
            (":content-type", "application/json"),
            (":message-type", "event"),
        ],
        payload.to_string().as_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_single_message() {
        let bytes = encode_event("messageStart", &json!({"role": "assistant"}));
        let mut decoder = EventStreamDecoder::new();
        decoder.push(&bytes);

        let message = decoder.next_message().unwrap().unwrap();

        assert_eq!(message.event_type(), Some("messageStart"));
        assert_eq!(message.message_type(), Some("event"));
        assert_eq!(message.header(":content-type"), Some("application/json"));
        let payload: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(payload["role"], "assistant");
        assert!(decoder.next_message().unwrap().is_none());
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_across_partial_pushes() {
        let mut bytes = encode_event("contentBlockDelta", &json!({"delta": {"text": "Hi"}}));
        bytes.extend(encode_event("contentBlockStop", &json!({"contentBlockIndex": 0})));

        let mut decoder = EventStreamDecoder::new();
        let mut events = Vec::new();
        for piece in bytes.chunks(7) {
            decoder.push(piece);
            while let Some(message) = decoder.next_message().unwrap() {
                events.push(message.event_type().unwrap_or_default().to_string());
            }
        }

        assert_eq!(events, vec!["contentBlockDelta", "contentBlockStop"]);
    }

    #[test]
    fn test_incomplete_prelude_needs_more() {
        let bytes = encode_event("messageStop", &json!({"stopReason": "end_turn"}));
        let mut decoder = EventStreamDecoder::new();
        decoder.push(&bytes[..5]);

        assert!(decoder.next_message().unwrap().is_none());
        assert_eq!(decoder.buffered(), 5);
    }

    #[test]
    fn test_prelude_checksum_mismatch() {
        let mut bytes = encode_event("messageStart", &json!({}));
        bytes[8] ^= 0xff;
        let mut decoder = EventStreamDecoder::new();
        decoder.push(&bytes);

        let err = decoder.next_message().unwrap_err();
        assert!(err.to_string().contains("prelude checksum mismatch"));
    }

    #[test]
    fn test_message_checksum_mismatch() {
        let mut bytes = encode_event("messageStart", &json!({"role": "assistant"}));
        let last = bytes.len() - 6;
        bytes[last] ^= 0x01;
        let mut decoder = EventStreamDecoder::new();
        decoder.push(&bytes);

        let err = decoder.next_message().unwrap_err();
        assert!(err.to_string().contains("message checksum mismatch"));
    }

    #[test]
    fn test_non_string_headers_are_skipped() {
        // name "flag" bool true, then name "n" int32, then a string header
        let mut headers = Vec::new();
        headers.extend_from_slice(&[4]);
        headers.extend_from_slice(b"flag");
        headers.push(HEADER_BOOL_TRUE);
        headers.extend_from_slice(&[1]);
        headers.extend_from_slice(b"n");
        headers.push(HEADER_INT);
        headers.extend_from_slice(&7u32.to_be_bytes());
        headers.extend_from_slice(&[3]);
        headers.extend_from_slice(b"key");
        headers.push(HEADER_STRING);
        headers.extend_from_slice(&5u16.to_be_bytes());
        headers.extend_from_slice(b"value");

        let decoded = decode_headers(&headers).unwrap();

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded.get("key").map(String::as_str), Some("value"));
    }

    #[test]
    fn test_truncated_header_is_error() {
        let headers = [3u8, b'k', b'e'];
        assert!(decode_headers(&headers).is_err());
    }
}
