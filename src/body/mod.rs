// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Body codec
//!
//! Converts bodies of any supported shape (bytes, text, JSON values, byte
//! streams) into canonical bytes plus an inferred media kind, and back into
//! a displayable form.

mod display;

use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{Headers, TransportError};

pub use display::{pretty_json, render_body, render_bytes, Decoded, INLINE_BYTES_LIMIT};

/// Default content type for bodies given as structured values
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Media kind of a canonical body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// No body at all
    None,
    /// Textual content
    Text,
    /// JSON content (may still be malformed on the wire)
    Json,
    /// Opaque bytes
    Binary,
}

/// Canonical body: raw bytes plus media kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    bytes: Bytes,
    kind: BodyKind,
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl Body {
    /// Empty body
    pub fn empty() -> Self {
        Self {
            bytes: Bytes::new(),
            kind: BodyKind::None,
        }
    }

    /// Text body
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind: if text.is_empty() {
                BodyKind::None
            } else {
                BodyKind::Text
            },
            bytes: Bytes::from(text),
        }
    }

    /// JSON body, compactly serialized
    pub fn json(value: &Value) -> Self {
        Self {
            bytes: Bytes::from(value.to_string()),
            kind: BodyKind::Json,
        }
    }

    /// Body with an explicit kind
    pub fn with_kind(bytes: impl Into<Bytes>, kind: BodyKind) -> Self {
        let bytes = bytes.into();
        Self {
            kind: if bytes.is_empty() { BodyKind::None } else { kind },
            bytes,
        }
    }

    /// Body captured off the wire; kind inferred from the content type
    pub fn infer(bytes: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        let bytes = bytes.into();
        let kind = if bytes.is_empty() {
            BodyKind::None
        } else {
            match content_type {
                Some(ct) => media_kind(ct),
                None => BodyKind::Binary,
            }
        };
        Self { bytes, kind }
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Media kind
    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    /// Byte length
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the body is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parsed JSON value, if the body is JSON and legal
    pub fn json_value(&self) -> Option<Value> {
        match self.kind {
            BodyKind::Json => serde_json::from_slice(&self.bytes).ok(),
            _ => None,
        }
    }

    /// Decode for display and comparison
    pub fn decode(&self) -> Decoded<'_> {
        Decoded::from_body(self)
    }

    /// Decode honouring the charset of a content type
    pub fn decode_with(&self, content_type: Option<&str>) -> Decoded<'_> {
        Decoded::new(self, content_type)
    }
}

/// Classify a content type
///
/// `application/json` and any `+json` subtype are JSON; `text/*` and the
/// common textual application types are text; everything else is binary.
pub fn media_kind(content_type: &str) -> BodyKind {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if essence == "application/json" || essence.ends_with("+json") {
        BodyKind::Json
    } else if essence.starts_with("text/")
        || essence.ends_with("+xml")
        || matches!(
            essence.as_str(),
            "application/x-www-form-urlencoded"
                | "application/javascript"
                | "application/xml"
        )
    {
        BodyKind::Text
    } else {
        BodyKind::Binary
    }
}

/// Check if a content type is JSON (including `+json` subtypes)
pub fn is_json_content_type(content_type: &str) -> bool {
    media_kind(content_type) == BodyKind::Json
}

/// Live byte-producing source
///
/// Clones share the same underlying stream; it can be drained exactly once.
#[derive(Clone)]
pub struct ByteStream {
    inner: Arc<Mutex<Option<BoxStream<'static, std::io::Result<Bytes>>>>>,
}

impl ByteStream {
    /// Wrap a stream of byte chunks
    pub fn new<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Some(stream.boxed()))),
        }
    }

    /// Stream from a fixed list of chunks
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<std::io::Result<Bytes>> =
            chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::new(futures::stream::iter(chunks))
    }

    /// Drain the stream fully
    ///
    /// A stream error stops draining; the bytes read so far are returned
    /// alongside the error.
    pub async fn drain(&self) -> Drained {
        let stream = self.inner.lock().take();
        let Some(mut stream) = stream else {
            return Drained {
                bytes: Bytes::new(),
                error: Some(TransportError::new("body stream was already consumed")),
            };
        };

        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => buf.extend_from_slice(&chunk),
                Err(err) => {
                    return Drained {
                        bytes: buf.freeze(),
                        error: Some(TransportError::from_io(&err)),
                    }
                }
            }
        }

        Drained {
            bytes: buf.freeze(),
            error: None,
        }
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ByteStream { .. }")
    }
}

/// Result of draining a byte stream
#[derive(Debug)]
pub struct Drained {
    pub bytes: Bytes,
    pub error: Option<TransportError>,
}

/// A body of not-yet-canonical shape
#[derive(Debug, Clone, Default)]
pub enum BodySource {
    /// No body
    #[default]
    Empty,
    /// Raw bytes, kept as-is
    Bytes(Bytes),
    /// Text, UTF-8 encoded
    Text(String),
    /// Structured value, JSON-serialized
    Json(Value),
    /// Live byte stream, drained before use
    Stream(ByteStream),
}

impl BodySource {
    /// Check if this is a live stream
    pub fn is_stream(&self) -> bool {
        matches!(self, BodySource::Stream(_))
    }

    /// Check if there is no body
    pub fn is_empty(&self) -> bool {
        matches!(self, BodySource::Empty)
    }
}

impl From<&str> for BodySource {
    fn from(s: &str) -> Self {
        BodySource::Text(s.to_string())
    }
}

impl From<String> for BodySource {
    fn from(s: String) -> Self {
        BodySource::Text(s)
    }
}

impl From<Vec<u8>> for BodySource {
    fn from(b: Vec<u8>) -> Self {
        BodySource::Bytes(Bytes::from(b))
    }
}

impl From<&[u8]> for BodySource {
    fn from(b: &[u8]) -> Self {
        BodySource::Bytes(Bytes::copy_from_slice(b))
    }
}

impl From<Bytes> for BodySource {
    fn from(b: Bytes) -> Self {
        BodySource::Bytes(b)
    }
}

impl From<Value> for BodySource {
    fn from(v: Value) -> Self {
        BodySource::Json(v)
    }
}

impl From<ByteStream> for BodySource {
    fn from(s: ByteStream) -> Self {
        BodySource::Stream(s)
    }
}

/// Canonicalized body plus any stream error hit while draining
#[derive(Debug)]
pub struct Canonical {
    pub body: Body,
    pub error: Option<TransportError>,
}

/// Canonicalize any body source, draining streams
///
/// Structured values set `Content-Type: application/json` when no content
/// type is declared; a declared one is kept even if it is not JSON.
pub async fn canonicalize(source: &BodySource, headers: &mut Headers) -> Canonical {
    match source {
        BodySource::Stream(stream) => {
            let drained = stream.drain().await;
            Canonical {
                body: Body::with_kind(drained.bytes, kind_for_declared(headers, BodyKind::Binary)),
                error: drained.error,
            }
        }
        other => Canonical {
            // Non-stream sources cannot fail.
            body: canonicalize_replayable(other, headers).unwrap_or_default(),
            error: None,
        },
    }
}

/// Canonicalize a source that must be re-playable
///
/// Fails with `UnsupportedBodyKind` for live streams.
pub fn canonicalize_replayable(source: &BodySource, headers: &mut Headers) -> Result<Body> {
    match source {
        BodySource::Empty => Ok(Body::empty()),
        BodySource::Bytes(bytes) => Ok(Body::with_kind(
            bytes.clone(),
            kind_for_declared(headers, BodyKind::Binary),
        )),
        BodySource::Text(text) => Ok(Body::with_kind(
            Bytes::from(text.clone()),
            kind_for_declared(headers, BodyKind::Text),
        )),
        BodySource::Json(value) => {
            if headers.content_type().is_none() {
                headers.set("Content-Type", JSON_CONTENT_TYPE);
            }
            Ok(Body::json(value))
        }
        BodySource::Stream(_) => Err(Error::unsupported_body(
            "a stream cannot be used as a re-playable body, please specify the bytes instead.",
        )),
    }
}

/// Expected-body canonicalization, without touching headers
pub fn canonicalize_expected(source: &BodySource) -> Result<Body> {
    match source {
        BodySource::Stream(_) => Err(Error::unsupported_body(
            "a stream cannot be used to verify the request body, please specify the bytes instead.",
        )),
        BodySource::Json(value) => Ok(Body::json(value)),
        BodySource::Text(text) => Ok(Body::text(text.clone())),
        BodySource::Bytes(bytes) => Ok(Body::with_kind(bytes.clone(), BodyKind::Binary)),
        BodySource::Empty => Ok(Body::empty()),
    }
}

fn kind_for_declared(headers: &Headers, fallback: BodyKind) -> BodyKind {
    headers.content_type().map(media_kind).unwrap_or(fallback)
}

/// Normalize transport framing headers against the real body length
///
/// Names are matched case-insensitively: when a transfer-encoding is declared
/// any content-length is dropped, otherwise a declared content-length is
/// corrected to `body_len`. Other duplicated-case headers are left alone.
pub fn normalize_framing(headers: &mut Headers, body_len: usize) {
    if headers.contains("transfer-encoding") {
        headers.remove("content-length");
    } else if let Some(name) = headers.original_name("content-length").map(String::from) {
        headers.set(name, body_len.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_media_kind() {
        assert_eq!(media_kind("application/json"), BodyKind::Json);
        assert_eq!(media_kind("application/vnd.api+json"), BodyKind::Json);
        assert_eq!(media_kind("application/json; charset=utf8"), BodyKind::Json);
        assert_eq!(media_kind("text/plain; charset=UTF-8"), BodyKind::Text);
        assert_eq!(media_kind("application/octet-stream"), BodyKind::Binary);
    }

    #[test]
    fn test_json_source_sets_content_type() {
        let mut headers = Headers::new();
        let body = canonicalize_replayable(&json!({"abc": 123}).into(), &mut headers).unwrap();
        assert_eq!(headers.content_type(), Some("application/json"));
        assert_eq!(body.as_bytes().as_ref(), br#"{"abc":123}"#);
        assert_eq!(body.kind(), BodyKind::Json);
    }

    #[test]
    fn test_json_source_keeps_declared_content_type() {
        let mut headers = Headers::new().with("Content-Type", "application/octet-stream");
        let body = canonicalize_replayable(&json!({"foo": "bar"}).into(), &mut headers).unwrap();
        assert_eq!(headers.content_type(), Some("application/octet-stream"));
        assert_eq!(body.as_bytes().as_ref(), br#"{"foo":"bar"}"#);
    }

    #[test]
    fn test_text_json_keeps_serialization() {
        let mut headers = Headers::new().with("Content-Type", "application/json");
        let body = canonicalize_replayable(&"{\"foo\":\n123\n}".into(), &mut headers).unwrap();
        assert_eq!(body.as_bytes().as_ref(), b"{\"foo\":\n123\n}");
        assert_eq!(body.kind(), BodyKind::Json);
    }

    #[test]
    fn test_stream_rejected_when_replayable() {
        let source = BodySource::Stream(ByteStream::from_chunks(vec!["foo"]));
        let err = canonicalize_expected(&source).unwrap_err();
        assert!(matches!(err, Error::UnsupportedBodyKind(_)));
    }

    #[tokio::test]
    async fn test_stream_drained() {
        let mut headers = Headers::new().with("Content-Type", "text/plain");
        let source = BodySource::Stream(ByteStream::from_chunks(vec!["foo", "bar", "quux"]));
        let canonical = canonicalize(&source, &mut headers).await;
        assert!(canonical.error.is_none());
        assert_eq!(canonical.body.as_bytes().as_ref(), b"foobarquux");
        assert_eq!(canonical.body.kind(), BodyKind::Text);
    }

    #[tokio::test]
    async fn test_stream_error_keeps_partial_bytes() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"yadda")),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "Fake error")),
        ];
        let stream = ByteStream::new(futures::stream::iter(chunks));
        let drained = stream.drain().await;
        assert_eq!(drained.bytes.as_ref(), b"yadda");
        assert_eq!(drained.error.unwrap().message, "Fake error");
    }

    #[test]
    fn test_normalize_framing_case_insensitive() {
        let mut headers = Headers::new()
            .with("transfer-encoding", "chunked")
            .with("content-length", "1");
        normalize_framing(&mut headers, 20);
        assert!(!headers.contains("Content-Length"));

        let mut headers = Headers::new().with("content-length", "5");
        normalize_framing(&mut headers, 7);
        assert_eq!(headers.get("Content-Length"), Some("7"));
        assert_eq!(headers.original_name("Content-Length"), Some("content-length"));
    }
}
