//! Wire framing for the UDP protocol
//!
//! Outbound: ASCII command lines of the form `VERB tag=<n>&key=value&…` with
//! URL-encoded parameter values, so titles and paths containing `&`, `=` or
//! spaces survive the trip.
//!
//! Inbound: datagrams are optionally gzip-compressed (detected by the `1f 8b`
//! magic prefix). The first line is tokenized in two stages:
//!
//! - strict grammar: `<tag> <3-digit code> <message…>` where the tag is a
//!   decimal integer;
//! - salvage grammar: the server sometimes echoes request text between the tag
//!   and the code, so as a fallback the first 3-digit token after the tag is
//!   taken as the code.
//!
//! A line neither grammar accepts is a framing error and the datagram is
//! dropped by the caller.

use crate::protocol::error::{ProtocolError, Result};
use bytes::{BufMut, BytesMut};
use flate2::read::GzDecoder;
use std::io::Read;

/// Gzip magic prefix marking a compressed datagram.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// An outbound command: verb plus ordered key/value parameters.
#[derive(Debug, Clone)]
pub struct Command {
    verb: &'static str,
    params: Vec<(String, String)>,
}

impl Command {
    pub fn new(verb: &'static str) -> Self {
        Self {
            verb,
            params: Vec::new(),
        }
    }

    pub fn verb(&self) -> &'static str {
        self.verb
    }

    /// Append a parameter. Order is preserved on the wire.
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Frame the command for transmission under the given correlation tag.
    pub fn encode(&self, tag: &str) -> Vec<u8> {
        let mut buffer = BytesMut::with_capacity(crate::protocol::MAX_PACKET_SIZE);
        buffer.put(self.verb.as_bytes());
        buffer.put_slice(b" tag=");
        buffer.put(tag.as_bytes());
        for (key, value) in &self.params {
            buffer.put_u8(b'&');
            buffer.put(key.as_bytes());
            buffer.put_u8(b'=');
            buffer.put(urlencoding::encode(value).as_bytes());
        }
        buffer.freeze().to_vec()
    }
}

/// A tokenized inbound reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Correlation tag echoed from the request.
    pub tag: String,
    /// Three-digit reply code.
    pub code: u16,
    /// Remainder of the first line after the code.
    pub message: String,
    /// Everything after the first line, untouched. Empty for single-line
    /// replies.
    pub payload: String,
}

/// Decompress and tokenize one inbound datagram.
pub fn parse_datagram(data: &[u8]) -> Result<Reply> {
    let inflated;
    let bytes = if data.starts_with(&GZIP_MAGIC) {
        inflated = inflate(data)?;
        inflated.as_slice()
    } else {
        data
    };

    let text = std::str::from_utf8(bytes)
        .map_err(|e| ProtocolError::framing(format!("reply is not valid UTF-8: {e}")))?;

    let (first_line, payload) = match text.split_once('\n') {
        Some((head, rest)) => (head, rest.trim_end_matches('\n').to_string()),
        None => (text, String::new()),
    };
    let first_line = first_line.trim_end_matches('\r');

    let (tag, code, message) = tokenize_strict(first_line)
        .or_else(|| tokenize_salvage(first_line))
        .ok_or_else(|| ProtocolError::framing(format!("unparseable reply line: {first_line:?}")))?;

    Ok(Reply {
        tag: tag.to_string(),
        code,
        message: message.to_string(),
        payload,
    })
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ProtocolError::framing(format!("gzip inflate failed: {e}")))?;
    Ok(out)
}

fn is_reply_code(token: &str) -> bool {
    token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit())
}

/// Strict grammar: `<decimal tag> <3-digit code> <message…>`.
fn tokenize_strict(line: &str) -> Option<(&str, u16, &str)> {
    let (tag, rest) = line.split_once(' ')?;
    if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (code, message) = match rest.split_once(' ') {
        Some((code, message)) => (code, message),
        None => (rest, ""),
    };
    if !is_reply_code(code) {
        return None;
    }

    Some((tag, code.parse().ok()?, message))
}

/// Salvage grammar: first token is the tag; the first 3-digit token after it
/// is the code, whatever sits in between.
fn tokenize_salvage(line: &str) -> Option<(&str, u16, &str)> {
    let (tag, rest) = line.split_once(' ')?;
    if tag.is_empty() {
        return None;
    }

    let mut cursor = rest;
    loop {
        let (token, after) = match cursor.split_once(' ') {
            Some((token, after)) => (token, after),
            None => (cursor, ""),
        };
        if is_reply_code(token) {
            return Some((tag, token.parse().ok()?, after));
        }
        if after.is_empty() {
            return None;
        }
        cursor = after;
    }
}
