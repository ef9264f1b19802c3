// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Observed request descriptor

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use url::Url;

use super::Headers;
use crate::body::Body;
use crate::error::{Error, Result};

/// Transport scheme of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    /// Plain HTTP
    #[default]
    Http,
    /// HTTP over TLS
    Https,
}

impl Scheme {
    /// Port used when none is given
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    /// Check if the scheme is encrypted
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Scheme::Https)
    }

    /// Parse a URL scheme
    pub fn from_url_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("http"),
            Scheme::Https => f.write_str("https"),
        }
    }
}

/// Client TLS material attached to a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    /// Client certificate (PEM)
    pub cert: Option<Bytes>,
    /// Client private key (PEM)
    pub key: Option<Bytes>,
    /// Trusted CA bundle (PEM)
    pub ca: Option<Bytes>,
}

impl TlsMaterial {
    /// Check if no material is present
    pub fn is_empty(&self) -> bool {
        self.cert.is_none() && self.key.is_none() && self.ca.is_none()
    }

    /// Fields in display order
    pub fn fields(&self) -> [(&'static str, Option<&Bytes>); 3] {
        [
            ("cert", self.cert.as_ref()),
            ("key", self.key.as_ref()),
            ("ca", self.ca.as_ref()),
        ]
    }
}

/// Canonical form of one observed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Request method, upper-case
    pub method: String,
    /// Plain or encrypted
    pub scheme: Scheme,
    /// Destination host
    pub host: String,
    /// Destination port
    pub port: u16,
    /// Path and query
    pub path: String,
    /// Request headers
    pub headers: Headers,
    /// Canonical body
    pub body: Body,
    /// Client TLS material
    pub tls: TlsMaterial,
    /// Whether the server certificate must be valid
    pub reject_unauthorized: Option<bool>,
    /// Time allowed for the response
    pub timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// Create a descriptor from a method and an absolute URL
    pub fn new(method: impl AsRef<str>, url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        Self::from_url(method, &url)
    }

    /// Create a descriptor from a parsed URL
    pub fn from_url(method: impl AsRef<str>, url: &Url) -> Result<Self> {
        let scheme = Scheme::from_url_scheme(url.scheme())
            .ok_or_else(|| Error::other(format!("unsupported scheme: {}", url.scheme())))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::other(format!("URL has no host: {}", url)))?
            .to_string();

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Self {
            method: method.as_ref().to_ascii_uppercase(),
            scheme,
            port: url.port().unwrap_or_else(|| scheme.default_port()),
            host,
            path,
            headers: Headers::new(),
            body: Body::empty(),
            tls: TlsMaterial::default(),
            reject_unauthorized: None,
            timeout: None,
        })
    }

    /// Set the headers
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Check if the request travels over TLS
    pub fn is_encrypted(&self) -> bool {
        self.scheme.is_encrypted()
    }

    /// `Host` header value implied by the destination
    pub fn host_header(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Absolute URL of the request
    pub fn url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host_header(), self.path)
    }

    /// HTTP/1.1 request line
    pub fn request_line(&self) -> String {
        format!("{} {} HTTP/1.1", self.method, self.path)
    }
}
