// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP client implementation
//!
//! While a session holds the interception registry, every request is routed
//! to it instead of the network. Otherwise requests go upstream through the
//! recorder.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Method;
use serde::Serialize;

use super::request::Request;
use super::response::Response;
use crate::body::{canonicalize, BodySource};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::model::{Headers, RequestDescriptor, ResponseDescriptor};
use crate::network::{InterceptAction, InterceptionRegistry, RequestInterceptor};
use crate::recorder::Recorder;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Default timeout
    pub timeout: Duration,
    /// Accept invalid certificates (dangerous!)
    pub accept_invalid_certs: bool,
    /// Headers added to every request that does not set them
    pub default_headers: Headers,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
            default_headers: Headers::new(),
        }
    }
}

/// HTTP client whose traffic can be diverted into a session
#[derive(Clone)]
pub struct HttpClient {
    recorder: Arc<Recorder>,
    config: HttpClientConfig,
    registry: &'static InterceptionRegistry,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let upstream = SessionConfig::new()
            .upstream_timeout(config.timeout)
            .accept_invalid_certs(config.accept_invalid_certs);

        Ok(Self {
            recorder: Arc::new(Recorder::new(&upstream)?),
            config,
            registry: InterceptionRegistry::global(),
        })
    }

    /// Execute a GET request
    pub fn get(&self, url: impl AsRef<str>) -> impl Future<Output = Result<Response>> + Send {
        let request = Request::get(url);
        let issued = request.map(|r| self.execute(r));
        async move { issued?.await }
    }

    /// Execute a POST request
    pub fn post(
        &self,
        url: impl AsRef<str>,
        body: impl Into<BodySource>,
    ) -> impl Future<Output = Result<Response>> + Send {
        let request = Request::post(url).map(|r| r.body(body));
        let issued = request.map(|r| self.execute(r));
        async move { issued?.await }
    }

    /// Execute a request
    ///
    /// The request is issued when this is called, not when the future is
    /// first polled: a diverted request takes its place in the issuance order
    /// immediately.
    pub fn execute(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        let diverted = self
            .registry
            .current()
            .map(|interceptor| {
                let ticket = interceptor.admit();
                (interceptor, ticket)
            });
        let client = self.clone();

        async move {
            let start = Instant::now();
            let url = request.url.clone();
            let descriptor = client.describe(request).await?;

            let response = match diverted {
                Some((interceptor, ticket)) => {
                    tracing::trace!(ticket, url = %url, "Request diverted");
                    match interceptor.intercept(ticket, descriptor).await {
                        InterceptAction::Respond(message) => ResponseDescriptor::Message(message),
                        InterceptAction::Abort(err) => ResponseDescriptor::Error(err),
                    }
                }
                None => client.recorder.forward(&descriptor).await,
            };

            let elapsed = start.elapsed().as_millis() as u64;
            match response {
                ResponseDescriptor::Message(message) => Response::from_message(message, url, elapsed),
                ResponseDescriptor::Error(err) => Err(Error::Transport(err)),
            }
        }
    }

    /// Execute multiple requests concurrently, issued in list order
    pub async fn execute_all(&self, requests: Vec<Request>) -> Vec<Result<Response>> {
        let futures: Vec<_> = requests.into_iter().map(|r| self.execute(r)).collect();
        futures::future::join_all(futures).await
    }

    /// Create a request builder
    pub fn request(&self, method: Method, url: impl AsRef<str>) -> Result<RequestBuilder> {
        Ok(RequestBuilder {
            client: self.clone(),
            request: Request::new(method, url)?,
        })
    }

    /// Get client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Canonical descriptor of an outbound request, draining its body
    async fn describe(&self, request: Request) -> Result<RequestDescriptor> {
        let mut descriptor = RequestDescriptor::from_url(request.method.as_str(), &request.url)?;

        let mut headers = Headers::new();
        if !request.headers.contains("host") {
            headers.append("Host", descriptor.host_header());
        }
        for (name, value) in request.headers.iter() {
            headers.append(name, value);
        }
        for (name, value) in self.config.default_headers.iter() {
            if !headers.contains(name) {
                headers.append(name, value);
            }
        }

        let canonical = canonicalize(&request.body, &mut headers).await;
        if let Some(err) = canonical.error {
            return Err(Error::Transport(err));
        }

        descriptor.headers = headers;
        descriptor.body = canonical.body;
        descriptor.tls = request.tls;
        descriptor.reject_unauthorized = request.reject_unauthorized;
        descriptor.timeout = request.timeout;
        Ok(descriptor)
    }
}

/// Builder for executing requests with the client
pub struct RequestBuilder {
    client: HttpClient,
    request: Request,
}

impl RequestBuilder {
    /// Set a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.header(name, value);
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<BodySource>) -> Self {
        self.request = self.request.body(body);
        self
    }

    /// Set JSON body
    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self> {
        self.request = self.request.json(data)?;
        Ok(self)
    }

    /// Set timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request = self.request.timeout(timeout);
        self
    }

    /// Attach a client certificate and key (PEM)
    pub fn identity(mut self, cert: impl Into<bytes::Bytes>, key: impl Into<bytes::Bytes>) -> Self {
        self.request = self.request.cert(cert).key(key);
        self
    }

    /// Trust a CA bundle (PEM)
    pub fn ca(mut self, ca: impl Into<bytes::Bytes>) -> Self {
        self.request = self.request.ca(ca);
        self
    }

    /// Require, or stop requiring, a valid server certificate
    pub fn reject_unauthorized(mut self, reject: bool) -> Self {
        self.request = self.request.reject_unauthorized(reject);
        self
    }

    /// Execute the request
    pub fn send(self) -> impl Future<Output = Result<Response>> + Send {
        self.client.execute(self.request)
    }
}
