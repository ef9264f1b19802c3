// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Expectation entries

use std::fmt;
use std::sync::Arc;

use super::{Headers, RequestDescriptor, ResponseDescriptor, ResponseMessage, TransportError};
use crate::body::BodySource;
use crate::matcher::RequestSpec;
use crate::session::ResponseSynthesizer;

/// Per-entry live verification options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Response headers excluded from the live comparison
    pub ignore_headers: Vec<String>,
}

/// How an expectation answers its request
#[derive(Clone)]
pub enum ResponseSpec {
    /// Bare status code, empty body
    Status(u16),
    /// Full response
    Message {
        status: u16,
        headers: Headers,
        body: BodySource,
    },
    /// Abort the request with a transport error
    Error(TransportError),
    /// Build the response imperatively
    Synthesized(Arc<dyn ResponseSynthesizer>),
}

impl ResponseSpec {
    /// Start a full response
    pub fn status(status: u16) -> Self {
        ResponseSpec::Message {
            status,
            headers: Headers::new(),
            body: BodySource::Empty,
        }
    }

    /// Add a response header
    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        match self.into_message() {
            ResponseSpec::Message {
                status,
                headers,
                body,
            } => ResponseSpec::Message {
                status,
                headers: headers.with(name, value),
                body,
            },
            other => other,
        }
    }

    /// Set the response body
    pub fn body(self, body: impl Into<BodySource>) -> Self {
        match self.into_message() {
            ResponseSpec::Message {
                status, headers, ..
            } => ResponseSpec::Message {
                status,
                headers,
                body: body.into(),
            },
            other => other,
        }
    }

    fn into_message(self) -> Self {
        match self {
            ResponseSpec::Status(status) => ResponseSpec::status(status),
            other => other,
        }
    }
}

impl fmt::Debug for ResponseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseSpec::Status(status) => f.debug_tuple("Status").field(status).finish(),
            ResponseSpec::Message {
                status,
                headers,
                body,
            } => f
                .debug_struct("Message")
                .field("status", status)
                .field("headers", headers)
                .field("body", body)
                .finish(),
            ResponseSpec::Error(err) => f.debug_tuple("Error").field(err).finish(),
            ResponseSpec::Synthesized(_) => f.write_str("Synthesized(..)"),
        }
    }
}

impl From<u16> for ResponseSpec {
    fn from(status: u16) -> Self {
        ResponseSpec::Status(status)
    }
}

impl From<TransportError> for ResponseSpec {
    fn from(err: TransportError) -> Self {
        ResponseSpec::Error(err)
    }
}

impl From<ResponseMessage> for ResponseSpec {
    fn from(message: ResponseMessage) -> Self {
        ResponseSpec::Message {
            status: message.status,
            headers: message.headers,
            body: BodySource::Bytes(message.body.as_bytes().clone()),
        }
    }
}

impl From<ResponseDescriptor> for ResponseSpec {
    fn from(descriptor: ResponseDescriptor) -> Self {
        match descriptor {
            ResponseDescriptor::Message(message) => message.into(),
            ResponseDescriptor::Error(err) => ResponseSpec::Error(err),
        }
    }
}

/// One declared request/response pairing
#[derive(Debug, Clone)]
pub struct ExpectationEntry {
    /// Request expectation; `None` matches anything
    pub request: Option<RequestSpec>,
    /// Response to deliver on a match
    pub response: ResponseSpec,
    /// Live verification options
    pub verify: VerifyOptions,
}

impl ExpectationEntry {
    /// Entry matching any request
    pub fn new(response: impl Into<ResponseSpec>) -> Self {
        Self {
            request: None,
            response: response.into(),
            verify: VerifyOptions::default(),
        }
    }

    /// Set the request expectation
    pub fn request(mut self, spec: impl Into<RequestSpec>) -> Self {
        self.request = Some(spec.into());
        self
    }

    /// Exclude a response header from live verification
    pub fn ignore_header(mut self, name: impl Into<String>) -> Self {
        self.verify.ignore_headers.push(name.into());
        self
    }
}

impl<R, S> From<(R, S)> for ExpectationEntry
where
    R: Into<RequestSpec>,
    S: Into<ResponseSpec>,
{
    fn from((request, response): (R, S)) -> Self {
        ExpectationEntry::new(response).request(request)
    }
}

impl From<&ExpectationEntry> for ExpectationEntry {
    fn from(entry: &ExpectationEntry) -> Self {
        entry.clone()
    }
}

/// Response of an entry once its body has been drained
#[derive(Clone)]
pub enum PreparedResponse {
    /// Deliver this message
    Message(ResponseMessage),
    /// Abort with this error
    Error(TransportError),
    /// Hand the exchange to a synthesizer
    Synthesized(Arc<dyn ResponseSynthesizer>),
}

impl fmt::Debug for PreparedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreparedResponse::Message(message) => f.debug_tuple("Message").field(message).finish(),
            PreparedResponse::Error(err) => f.debug_tuple("Error").field(err).finish(),
            PreparedResponse::Synthesized(_) => f.write_str("Synthesized(..)"),
        }
    }
}

/// Snapshot of an entry taken at session start
#[derive(Debug, Clone)]
pub struct PreparedEntry {
    /// Position in the declared list
    pub index: usize,
    /// Request expectation
    pub request: Option<RequestSpec>,
    /// Response to deliver
    pub response: PreparedResponse,
    /// Live verification options
    pub verify: VerifyOptions,
}

/// A captured real exchange
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEntry {
    /// What was sent
    pub request: RequestDescriptor,
    /// What came back
    pub response: ResponseDescriptor,
}

impl RecordedEntry {
    /// Turn the capture into a replayable expectation
    pub fn to_expectation(&self) -> ExpectationEntry {
        ExpectationEntry::new(self.response.clone())
            .request(RequestSpec::from_descriptor(&self.request))
    }
}
