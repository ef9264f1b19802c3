// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Decoding bodies for comparison and display

use std::borrow::Cow;

use serde_json::Value;

use super::{Body, BodyKind};

/// Binary bodies up to this length render (and persist) as explicit byte lists
pub const INLINE_BYTES_LIMIT: usize = 32;

const HEX_DUMP_WIDTH: usize = 16;

/// A body decoded according to its media kind
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<'a> {
    /// No body
    Empty,
    /// Text content
    Text(Cow<'a, str>),
    /// Legal JSON content
    Json(Value),
    /// Declared as JSON but not parseable
    InvalidJson(Cow<'a, str>),
    /// Opaque bytes
    Bytes(&'a [u8]),
}

impl<'a> Decoded<'a> {
    /// Decode a body, honouring the charset of its content type
    pub fn new(body: &'a Body, content_type: Option<&str>) -> Self {
        let bytes = body.as_bytes().as_ref();
        match body.kind() {
            BodyKind::None => Decoded::Empty,
            BodyKind::Json => match serde_json::from_slice(bytes) {
                Ok(value) => Decoded::Json(value),
                Err(_) => Decoded::InvalidJson(String::from_utf8_lossy(bytes)),
            },
            BodyKind::Text => match decode_text(bytes, content_type) {
                Some(text) => Decoded::Text(text),
                None => Decoded::Bytes(bytes),
            },
            BodyKind::Binary => Decoded::Bytes(bytes),
        }
    }

    pub(crate) fn from_body(body: &'a Body) -> Self {
        Self::new(body, None)
    }
}

fn decode_text<'a>(bytes: &'a [u8], content_type: Option<&str>) -> Option<Cow<'a, str>> {
    let latin1 = content_type
        .and_then(|ct| {
            ct.split(';')
                .skip(1)
                .find_map(|param| param.trim().strip_prefix("charset="))
                .map(|cs| cs.trim_matches('"').to_ascii_lowercase())
        })
        .map(|cs| matches!(cs.as_str(), "iso-8859-1" | "latin1" | "latin-1"))
        .unwrap_or(false);

    if latin1 {
        return Some(Cow::Owned(bytes.iter().map(|&b| b as char).collect()));
    }
    std::str::from_utf8(bytes).ok().map(Cow::Borrowed)
}

/// Display lines for a body
pub fn render_body(body: &Body, content_type: Option<&str>) -> Vec<String> {
    match Decoded::new(body, content_type) {
        Decoded::Empty => Vec::new(),
        Decoded::Text(text) => text.lines().map(String::from).collect(),
        Decoded::Json(value) => pretty_json(&value),
        Decoded::InvalidJson(text) => {
            let mut lines: Vec<String> = text.lines().map(String::from).collect();
            lines.push("// invalid JSON".to_string());
            lines
        }
        Decoded::Bytes(bytes) => render_bytes(bytes),
    }
}

/// Pretty-printed JSON, one entry per line
pub fn pretty_json(value: &Value) -> Vec<String> {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|_| value.to_string())
        .lines()
        .map(String::from)
        .collect()
}

/// Byte listing for short buffers, hex dump for longer ones
pub fn render_bytes(bytes: &[u8]) -> Vec<String> {
    if bytes.len() <= INLINE_BYTES_LIMIT {
        let listed: Vec<String> = bytes.iter().map(|b| format!("0x{:02x}", b)).collect();
        return vec![format!("[{}]", listed.join(", "))];
    }

    bytes
        .chunks(HEX_DUMP_WIDTH)
        .map(|chunk| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!("{:<width$} │{}│", hex.join(" "), ascii, width = HEX_DUMP_WIDTH * 3 - 1)
        })
        .collect()
}
