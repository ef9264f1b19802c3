// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP request types and builder

use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::body::{BodySource, ByteStream};
use crate::error::Result;
use crate::model::{Headers, TlsMaterial};

/// HTTP request representation
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method
    pub method: Method,
    /// Request URL
    pub url: Url,
    /// Request headers, in the order they were set
    pub headers: Headers,
    /// Request body
    pub body: BodySource,
    /// Request timeout
    pub timeout: Option<Duration>,
    /// Client TLS material
    pub tls: TlsMaterial,
    /// Whether the server certificate must be valid
    pub reject_unauthorized: Option<bool>,
}

impl Request {
    /// Create a new GET request
    pub fn get(url: impl AsRef<str>) -> Result<Self> {
        Self::new(Method::GET, url)
    }

    /// Create a new POST request
    pub fn post(url: impl AsRef<str>) -> Result<Self> {
        Self::new(Method::POST, url)
    }

    /// Create a new request with arbitrary method
    pub fn new(method: Method, url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            method,
            url: Url::parse(url.as_ref())?,
            headers: Headers::new(),
            body: BodySource::Empty,
            timeout: None,
            tls: TlsMaterial::default(),
            reject_unauthorized: None,
        })
    }

    /// Set a header, replacing any value under the same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Set multiple headers
    pub fn headers<I, N, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.headers.set(name, value);
        }
        self
    }

    /// Set the request body
    pub fn body(mut self, body: impl Into<BodySource>) -> Self {
        self.body = body.into();
        self
    }

    /// Stream the request body
    pub fn body_stream(mut self, stream: ByteStream) -> Self {
        self.body = BodySource::Stream(stream);
        self
    }

    /// Set JSON body
    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self> {
        self.body = BodySource::Json(serde_json::to_value(data)?);
        if !self.headers.contains("content-type") {
            self = self.header("Content-Type", "application/json");
        }
        Ok(self)
    }

    /// Set form body
    pub fn form<K: AsRef<str>, V: AsRef<str>>(mut self, data: &[(K, V)]) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(data.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
            .finish();
        self.body = BodySource::Text(body);
        self.header("Content-Type", "application/x-www-form-urlencoded")
    }

    /// Set timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a client certificate (PEM)
    pub fn cert(mut self, cert: impl Into<Bytes>) -> Self {
        self.tls.cert = Some(cert.into());
        self
    }

    /// Attach a client private key (PEM)
    pub fn key(mut self, key: impl Into<Bytes>) -> Self {
        self.tls.key = Some(key.into());
        self
    }

    /// Trust a CA bundle (PEM)
    pub fn ca(mut self, ca: impl Into<Bytes>) -> Self {
        self.tls.ca = Some(ca.into());
        self
    }

    /// Require, or stop requiring, a valid server certificate
    pub fn reject_unauthorized(mut self, reject: bool) -> Self {
        self.reject_unauthorized = Some(reject);
        self
    }

    /// Get the URL as string
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }

    /// Get the host
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Get the origin
    pub fn origin(&self) -> String {
        format!(
            "{}://{}{}",
            self.url.scheme(),
            self.url.host_str().unwrap_or(""),
            self.url
                .port()
                .map(|p| format!(":{}", p))
                .unwrap_or_default()
        )
    }
}
