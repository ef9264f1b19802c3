// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request expectations

use bytes::Bytes;
use url::Url;

use super::predicate::SharedPredicate;
use crate::body::{canonicalize_replayable, BodyKind, BodySource};
use crate::error::{Error, Result};
use crate::model::{Headers, RequestDescriptor, Scheme, TlsMaterial};

/// Expected header value
#[derive(Debug, Clone)]
pub enum ValueSpec {
    /// Exact string equality
    Exact(String),
    /// Custom check
    Predicate(SharedPredicate),
}

impl From<&str> for ValueSpec {
    fn from(s: &str) -> Self {
        ValueSpec::Exact(s.to_string())
    }
}

impl From<String> for ValueSpec {
    fn from(s: String) -> Self {
        ValueSpec::Exact(s)
    }
}

impl From<SharedPredicate> for ValueSpec {
    fn from(p: SharedPredicate) -> Self {
        ValueSpec::Predicate(p)
    }
}

/// Expected body
#[derive(Debug, Clone)]
pub enum BodySpec {
    /// Equality with a concrete body (structural for JSON)
    Exact(BodySource),
    /// Custom check
    Predicate(SharedPredicate),
}

/// What an intercepted request must look like
///
/// Every field left as `None` (or empty) is "don't care".
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    pub method: Option<String>,
    pub path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub encrypted: Option<bool>,
    pub headers: Vec<(String, ValueSpec)>,
    pub body: Option<BodySpec>,
    pub tls: TlsMaterial,
    pub reject_unauthorized: Option<bool>,
    /// Check on the whole request
    pub predicate: Option<SharedPredicate>,
}

impl RequestSpec {
    /// Expectation matching any request
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse `"GET /path"`, `"POST http://host:port/path"`, `"https://host/"` or `"/path"`
    ///
    /// An absolute URL also pins the host, any explicitly written port, the
    /// `Host` header and, for `https`, encryption. A URL that does not parse
    /// is kept as a literal path.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let mut spec = Self::default();

        let rest = match text.split_once(char::is_whitespace) {
            Some((method, rest)) if is_method(method) => {
                spec.method = Some(method.to_string());
                rest.trim()
            }
            None if is_method(text) => {
                spec.method = Some(text.to_string());
                ""
            }
            _ => text,
        };

        if rest.is_empty() {
            return spec;
        }

        let lower = rest.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            if let Ok(url) = Url::parse(rest) {
                spec.apply_url(&url);
                return spec;
            }
        }

        spec.path = Some(rest.to_string());
        spec
    }

    fn apply_url(&mut self, url: &Url) {
        let scheme = Scheme::from_url_scheme(url.scheme()).unwrap_or_default();
        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        self.path = Some(path);

        if let Some(host) = url.host_str() {
            self.host = Some(host.to_string());
            self.port = url.port();
            let host_header = match url.port() {
                Some(port) if port != scheme.default_port() => format!("{}:{}", host, port),
                _ => host.to_string(),
            };
            if !self.has_header("host") {
                self.headers
                    .push(("Host".to_string(), ValueSpec::Exact(host_header)));
            }
        }

        if scheme.is_encrypted() {
            self.encrypted = Some(true);
        }
    }

    /// Exact expectation for everything a captured request carried
    pub fn from_descriptor(request: &RequestDescriptor) -> Self {
        let body = match request.body.kind() {
            BodyKind::None => None,
            BodyKind::Json => Some(BodySpec::Exact(match request.body.json_value() {
                Some(value) => BodySource::Json(value),
                None => BodySource::Bytes(request.body.as_bytes().clone()),
            })),
            BodyKind::Text => Some(BodySpec::Exact(
                match std::str::from_utf8(request.body.as_bytes()) {
                    Ok(text) => BodySource::Text(text.to_string()),
                    Err(_) => BodySource::Bytes(request.body.as_bytes().clone()),
                },
            )),
            BodyKind::Binary => Some(BodySpec::Exact(BodySource::Bytes(
                request.body.as_bytes().clone(),
            ))),
        };

        Self {
            method: Some(request.method.clone()),
            path: Some(request.path.clone()),
            host: Some(request.host.clone()),
            port: Some(request.port),
            encrypted: request.is_encrypted().then_some(true),
            headers: exact_headers(&request.headers),
            body,
            tls: request.tls.clone(),
            reject_unauthorized: request.reject_unauthorized,
            predicate: None,
        }
    }

    /// Build the concrete request this expectation describes
    ///
    /// Needs a host; fails when a header or the body is only given as a predicate.
    pub fn to_descriptor(&self) -> Result<RequestDescriptor> {
        let host = self
            .host
            .clone()
            .ok_or_else(|| Error::other("request expectation has no host"))?;
        let scheme = if self.encrypted == Some(true) {
            Scheme::Https
        } else {
            Scheme::Http
        };

        let mut headers = Headers::new();
        for (name, value) in &self.headers {
            match value {
                ValueSpec::Exact(v) => headers.append(name.clone(), v.clone()),
                ValueSpec::Predicate(p) => {
                    return Err(Error::other(format!(
                        "header {} is only described by a predicate ({})",
                        name,
                        p.describe()
                    )))
                }
            }
        }

        let body = match &self.body {
            None => Default::default(),
            Some(BodySpec::Exact(source)) => canonicalize_replayable(source, &mut headers)?,
            Some(BodySpec::Predicate(p)) => {
                return Err(Error::other(format!(
                    "body is only described by a predicate ({})",
                    p.describe()
                )))
            }
        };

        Ok(RequestDescriptor {
            method: self.method.clone().unwrap_or_else(|| "GET".to_string()),
            scheme,
            port: self.port.unwrap_or_else(|| scheme.default_port()),
            host,
            path: self.path.clone().unwrap_or_else(|| "/".to_string()),
            headers,
            body,
            tls: self.tls.clone(),
            reject_unauthorized: self.reject_unauthorized,
            timeout: None,
        })
    }

    /// Expect a method
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into().to_ascii_uppercase());
        self
    }

    /// Expect a path (with query)
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Expect a host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Expect a port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Expect an encrypted (or explicitly plain) request
    pub fn encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = Some(encrypted);
        self
    }

    /// Expect a header; replaces any earlier expectation for the same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<ValueSpec>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    /// Expect a concrete body
    pub fn body(mut self, body: impl Into<BodySource>) -> Self {
        self.body = Some(BodySpec::Exact(body.into()));
        self
    }

    /// Expect a body satisfying a predicate
    pub fn body_satisfies(mut self, predicate: SharedPredicate) -> Self {
        self.body = Some(BodySpec::Predicate(predicate));
        self
    }

    /// Expect a client certificate
    pub fn cert(mut self, cert: impl Into<Bytes>) -> Self {
        self.tls.cert = Some(cert.into());
        self
    }

    /// Expect a client private key
    pub fn key(mut self, key: impl Into<Bytes>) -> Self {
        self.tls.key = Some(key.into());
        self
    }

    /// Expect a CA bundle
    pub fn ca(mut self, ca: impl Into<Bytes>) -> Self {
        self.tls.ca = Some(ca.into());
        self
    }

    /// Expect a certificate validation setting
    pub fn reject_unauthorized(mut self, reject: bool) -> Self {
        self.reject_unauthorized = Some(reject);
        self
    }

    /// Check the whole request with a predicate
    pub fn satisfies(mut self, predicate: SharedPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Exact expected value of a header, if one is declared
    pub fn exact_header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|(n, v)| match v {
            ValueSpec::Exact(v) if n.eq_ignore_ascii_case(name) => Some(v.as_str()),
            _ => None,
        })
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

impl From<&str> for RequestSpec {
    fn from(text: &str) -> Self {
        RequestSpec::parse(text)
    }
}

impl From<String> for RequestSpec {
    fn from(text: String) -> Self {
        RequestSpec::parse(&text)
    }
}

impl From<SharedPredicate> for RequestSpec {
    fn from(predicate: SharedPredicate) -> Self {
        RequestSpec::any().satisfies(predicate)
    }
}

/// One exact expectation per header name; repeated values are joined the way
/// the matcher joins them
fn exact_headers(headers: &Headers) -> Vec<(String, ValueSpec)> {
    let mut out: Vec<(String, ValueSpec)> = Vec::new();
    for (name, _) in headers.iter() {
        if out.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
            continue;
        }
        let value = headers.get_all(name).join(", ");
        out.push((name.to_string(), ValueSpec::Exact(value)));
    }
    out
}

fn is_method(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_uppercase())
}
