// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for verkko
//!
//! Every failure a check can end with is one variant here. Variants that come
//! out of a session carry the fully rendered, field-annotated diff as their
//! message, so `to_string()` is what the test author reads.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::TransportError;

/// Result type alias for verkko operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for verkko
#[derive(Error, Debug)]
pub enum Error {
    /// An intercepted request failed its paired expectation
    #[error("{report}")]
    RequestMismatch { report: String },

    /// Expectations were left unconsumed when the session closed
    #[error("{report}")]
    MissingTraffic { report: String, missing: usize },

    /// More requests were issued than expectations were declared
    #[error("{report}")]
    UnexpectedTraffic { report: String },

    /// A live byte stream was used where a re-playable body is required
    #[error("verkko: {0}")]
    UnsupportedBodyKind(String),

    /// Terminal network-level failure, real or synthesized
    #[error("{0}")]
    Transport(TransportError),

    /// The mocked exchange and the live service disagree
    #[error("The mock and service have diverged.\n\n{report}")]
    Divergence { report: String },

    /// A predicate could not be evaluated at all
    #[error("verkko: invalid predicate: {0}")]
    Predicate(String),

    /// The code under test itself failed
    #[error("{message}{traffic}")]
    Delegate { message: String, traffic: String },

    /// A panic escaped the code under test
    #[error("panic escaped the code under test: {message}{traffic}")]
    Escaped { message: String, traffic: String },

    /// A response synthesis function failed
    #[error("response synthesizer failed: {0}")]
    Synthesizer(String),

    /// Fixture file could not be read or written
    #[error("fixture {path}: {reason}")]
    Fixture { path: PathBuf, reason: String },

    /// Recorded exchanges could not be injected at the call site
    #[error("cannot inject recording into {path}: {reason}")]
    Injection { path: PathBuf, reason: String },

    /// HTTP request failed before a response could be captured
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an unsupported body kind error
    pub fn unsupported_body(reason: impl Into<String>) -> Self {
        Error::UnsupportedBodyKind(reason.into())
    }

    /// Create a predicate error
    pub fn predicate(reason: impl Into<String>) -> Self {
        Error::Predicate(reason.into())
    }

    /// Create a fixture error
    pub fn fixture(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Fixture {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an injection error
    pub fn injection(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Injection {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if a request failed its expectation
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Error::RequestMismatch { .. })
    }

    /// Check if expected traffic never happened
    pub fn is_missing(&self) -> bool {
        matches!(self, Error::MissingTraffic { .. })
    }

    /// Check if more traffic happened than was declared
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Error::UnexpectedTraffic { .. })
    }

    /// Check if the mock and the live service disagree
    pub fn is_divergence(&self) -> bool {
        matches!(self, Error::Divergence { .. })
    }

    /// Check if this is a transport-level failure
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Http(_))
    }

    /// Fatal errors short-circuit a session immediately
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::UnsupportedBodyKind(_) | Error::Predicate(_))
    }

    /// Get the transport error if this is one
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Error::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::Transport(err)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Attribute a failure to a fixture file
    fn with_fixture(self, path: &std::path::Path) -> Result<T>;

    /// Add operation context to error
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E: Into<Error>> ErrorContext<T> for std::result::Result<T, E> {
    fn with_fixture(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| match e.into() {
            err @ Error::Fixture { .. } => err,
            err @ Error::Predicate(_) => err,
            other => Error::fixture(path, other.to_string()),
        })
    }

    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            Error::Other(format!("{}: {}", msg, err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err = Error::RequestMismatch {
            report: "GET / HTTP/1.1".into(),
        };
        assert!(err.is_mismatch());
        assert!(!err.is_fatal());

        assert!(Error::predicate("unknown").is_fatal());
        assert!(Error::unsupported_body("stream").is_fatal());
    }

    #[test]
    fn test_divergence_message() {
        let err = Error::Divergence {
            report: "HTTP/1.1 200 OK".into(),
        };
        assert!(err.to_string().starts_with("The mock and service have diverged."));
        assert!(err.is_divergence());
    }

    #[test]
    fn test_fixture_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        let err = result
            .with_fixture(std::path::Path::new("mocks.json"))
            .unwrap_err();
        assert!(matches!(err, Error::Fixture { .. }));
        assert!(err.to_string().contains("mocks.json"));
    }
}
