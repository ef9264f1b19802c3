// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Imperative response synthesis

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;

use crate::body::{normalize_framing, Body};
use crate::model::{Headers, RequestDescriptor, ResponseMessage, ResponseSpec};
use crate::network::trap;

/// Builds a response by hand from the intercepted request
///
/// Returning an error, or panicking, fails the session and aborts the
/// request.
pub trait ResponseSynthesizer: Send + Sync {
    /// Fill in `response` for `request`
    fn synthesize(&self, request: &SynthRequest, response: &mut SynthResponse)
        -> anyhow::Result<()>;
}

struct FnSynthesizer<F>(F);

impl<F> ResponseSynthesizer for FnSynthesizer<F>
where
    F: Fn(&SynthRequest, &mut SynthResponse) -> anyhow::Result<()> + Send + Sync,
{
    fn synthesize(
        &self,
        request: &SynthRequest,
        response: &mut SynthResponse,
    ) -> anyhow::Result<()> {
        (self.0)(request, response)
    }
}

/// Response built by a closure
///
/// # Example
///
/// ```rust,no_run
/// use verkko::session::synthesize;
/// use verkko::ExpectationEntry;
///
/// let entry = ExpectationEntry::new(synthesize(|req, res| {
///     res.status(201).header("X-Echo", req.path.as_str());
///     res.write(req.body.clone())?;
///     res.end();
///     Ok(())
/// }));
/// ```
pub fn synthesize<F>(f: F) -> ResponseSpec
where
    F: Fn(&SynthRequest, &mut SynthResponse) -> anyhow::Result<()> + Send + Sync + 'static,
{
    ResponseSpec::Synthesized(Arc::new(FnSynthesizer(f)))
}

/// The request as a synthesizer sees it, body fully consumed
#[derive(Debug, Clone)]
pub struct SynthRequest {
    pub method: String,
    pub path: String,
    pub host: String,
    pub port: u16,
    pub encrypted: bool,
    pub headers: Headers,
    pub body: Bytes,
}

impl SynthRequest {
    fn from_descriptor(request: &RequestDescriptor) -> Self {
        Self {
            method: request.method.clone(),
            path: request.path.clone(),
            host: request.host.clone(),
            port: request.port,
            encrypted: request.is_encrypted(),
            headers: request.headers.clone(),
            body: request.body.as_bytes().clone(),
        }
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Body as UTF-8 text
    pub fn text(&self) -> anyhow::Result<&str> {
        Ok(std::str::from_utf8(&self.body)?)
    }

    /// Body parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Response handle a synthesizer writes into
#[derive(Debug)]
pub struct SynthResponse {
    status: u16,
    headers: Headers,
    body: BytesMut,
    ended: bool,
}

impl Default for SynthResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body: BytesMut::new(),
            ended: false,
        }
    }
}

impl SynthResponse {
    /// Set the status code
    pub fn status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    /// Set a header
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.set(name, value);
        self
    }

    /// Append a body chunk
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) -> anyhow::Result<&mut Self> {
        if self.ended {
            anyhow::bail!("write after end");
        }
        self.body.extend_from_slice(chunk.as_ref());
        Ok(self)
    }

    /// Finish the response
    pub fn end(&mut self) {
        self.ended = true;
    }

    /// Check if `end` was called
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    fn into_message(self) -> ResponseMessage {
        let mut headers = self.headers;
        normalize_framing(&mut headers, self.body.len());
        let body = Body::infer(self.body.freeze(), headers.content_type());
        ResponseMessage {
            status: self.status,
            headers,
            body,
        }
    }
}

/// Run a synthesizer, turning errors and panics into a failure message
pub(crate) fn run(
    synthesizer: &dyn ResponseSynthesizer,
    request: &RequestDescriptor,
) -> Result<ResponseMessage, String> {
    let request = SynthRequest::from_descriptor(request);
    let mut response = SynthResponse::default();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        trap::suppressed(|| synthesizer.synthesize(&request, &mut response))
    }));

    match outcome {
        Ok(Ok(())) => Ok(response.into_message()),
        Ok(Err(err)) => Err(format!("{:#}", err)),
        Err(payload) => Err(trap::panic_message(payload.as_ref())),
    }
}
