// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Response descriptors and transport errors

use std::fmt;
use std::io;

use reqwest::StatusCode;
use serde_json::{Map, Value};

use super::Headers;
use crate::body::Body;

/// Terminal transport-level failure in place of an HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct TransportError {
    /// Human-readable message
    pub message: String,
    /// Side attributes (`code`, `syscall`, `host`, `port`, ...)
    pub attributes: Map<String, Value>,
}

impl TransportError {
    /// Create an error with a message only
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attributes: Map::new(),
        }
    }

    /// Attach a side attribute
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Error code attribute (`ECONNRESET`, ...)
    pub fn code(&self) -> Option<&str> {
        self.attributes.get("code").and_then(Value::as_str)
    }

    /// A peer that closed the socket without answering
    pub fn socket_hang_up() -> Self {
        Self::new("socket hang up").with("code", "ECONNRESET")
    }

    /// No response arrived in time
    pub fn timed_out(host: &str, port: u16) -> Self {
        Self::new(format!("connect ETIMEDOUT {}:{}", host, port))
            .with("code", "ETIMEDOUT")
            .with("syscall", "connect")
            .with("host", host)
            .with("port", port)
    }

    /// Map an I/O error onto the conventional error codes
    pub fn from_io(err: &io::Error) -> Self {
        let code = match err.kind() {
            io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
            io::ErrorKind::ConnectionReset | io::ErrorKind::UnexpectedEof => Some("ECONNRESET"),
            io::ErrorKind::ConnectionAborted => Some("ECONNABORTED"),
            io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
            _ => None,
        };

        let error = Self::new(err.to_string());
        match code {
            Some(code) => error.with("code", code),
            None => error,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) if !self.message.contains(code) => write!(f, "{} ({})", self.message, code),
            _ => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// An HTTP response as delivered to the code under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    /// Status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Canonical body
    pub body: Body,
}

impl Default for ResponseMessage {
    fn default() -> Self {
        Self::new(200)
    }
}

impl ResponseMessage {
    /// Create an empty response with a status code
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::empty(),
        }
    }

    /// HTTP/1.1 status line with the canonical reason phrase
    pub fn status_line(&self) -> String {
        status_line(self.status)
    }
}

/// Render `HTTP/1.1 <code> <reason>`
pub fn status_line(status: u16) -> String {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason());
    match reason {
        Some(reason) => format!("HTTP/1.1 {} {}", status, reason),
        None => format!("HTTP/1.1 {}", status),
    }
}

/// What a request received: a message or a transport failure
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseDescriptor {
    /// An HTTP response
    Message(ResponseMessage),
    /// A terminal transport error
    Error(TransportError),
}

impl ResponseDescriptor {
    /// Get the message if this is one
    pub fn message(&self) -> Option<&ResponseMessage> {
        match self {
            ResponseDescriptor::Message(message) => Some(message),
            ResponseDescriptor::Error(_) => None,
        }
    }

    /// Get the transport error if this is one
    pub fn error(&self) -> Option<&TransportError> {
        match self {
            ResponseDescriptor::Error(err) => Some(err),
            ResponseDescriptor::Message(_) => None,
        }
    }
}

impl From<ResponseMessage> for ResponseDescriptor {
    fn from(message: ResponseMessage) -> Self {
        ResponseDescriptor::Message(message)
    }
}

impl From<TransportError> for ResponseDescriptor {
    fn from(err: TransportError) -> Self {
        ResponseDescriptor::Error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_reason() {
        assert_eq!(status_line(200), "HTTP/1.1 200 OK");
        assert_eq!(status_line(412), "HTTP/1.1 412 Precondition Failed");
        assert_eq!(status_line(599), "HTTP/1.1 599");
    }

    #[test]
    fn test_transport_error_from_io() {
        let err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err = TransportError::from_io(&err);
        assert_eq!(err.code(), Some("ECONNREFUSED"));
        assert_eq!(err.to_string(), "refused (ECONNREFUSED)");
    }

    #[test]
    fn test_socket_hang_up() {
        let err = TransportError::socket_hang_up();
        assert_eq!(err.message, "socket hang up");
        assert_eq!(err.code(), Some("ECONNRESET"));
    }

    #[test]
    fn test_timed_out() {
        let err = TransportError::timed_out("localhost", 8080);
        assert_eq!(err.to_string(), "connect ETIMEDOUT localhost:8080");
        assert_eq!(err.code(), Some("ETIMEDOUT"));
        assert_eq!(err.attributes.get("port"), Some(&serde_json::json!(8080)));
    }
}
