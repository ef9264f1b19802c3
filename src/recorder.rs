// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Recorder
//!
//! Forwards a request verbatim to its real destination and captures what came
//! back. Transport failures are captured as error-shaped responses, never
//! raised past the recorder.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Certificate, Client, ClientBuilder, Identity, Method};

use crate::body::Body;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::model::{
    canonical_name, Headers, RequestDescriptor, ResponseDescriptor, ResponseMessage,
    TransportError,
};

/// Framing headers recomputed by the transport, never forwarded
const FRAMING_HEADERS: &[&str] = &["content-length", "transfer-encoding"];

/// Upstream forwarding client
#[derive(Clone)]
pub struct Recorder {
    client: Client,
    timeout: Duration,
    accept_invalid_certs: bool,
}

impl Recorder {
    /// Create a recorder from session configuration
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let client = Self::builder(config.upstream_timeout, config.accept_invalid_certs).build()?;
        Ok(Self {
            client,
            timeout: config.upstream_timeout,
            accept_invalid_certs: config.accept_invalid_certs,
        })
    }

    fn builder(timeout: Duration, accept_invalid_certs: bool) -> ClientBuilder {
        Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .http1_title_case_headers()
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(accept_invalid_certs)
    }

    /// Forward a request and capture the exchange
    pub async fn forward(&self, request: &RequestDescriptor) -> ResponseDescriptor {
        tracing::debug!(url = %request.url(), method = %request.method, "Forwarding request upstream");

        match self.try_forward(request).await {
            Ok(message) => {
                tracing::debug!(status = message.status, url = %request.url(), "Upstream responded");
                ResponseDescriptor::Message(message)
            }
            Err(err) => {
                tracing::debug!(error = %err, url = %request.url(), "Upstream transport failure");
                ResponseDescriptor::Error(err)
            }
        }
    }

    async fn try_forward(
        &self,
        request: &RequestDescriptor,
    ) -> std::result::Result<ResponseMessage, TransportError> {
        let client = self.client_for(request)?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransportError::new(format!("invalid method: {}", e)))?;

        let mut builder = client.request(method, request.url());
        for (name, value) in request.headers.iter() {
            if FRAMING_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name)) {
                continue;
            }
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.as_bytes().clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| transport_error(&e, request))?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    canonical_name(name.as_str()),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(&e, request))?;
        let body = Body::infer(bytes, headers.content_type());

        Ok(ResponseMessage {
            status,
            headers,
            body,
        })
    }

    /// Shared client, or a dedicated one when the request carries TLS options
    fn client_for(&self, request: &RequestDescriptor) -> std::result::Result<Client, TransportError> {
        let relaxed = request.reject_unauthorized == Some(false);
        if request.tls.is_empty() && !relaxed {
            return Ok(self.client.clone());
        }

        let mut builder = Self::builder(self.timeout, self.accept_invalid_certs || relaxed);

        if let Some(ca) = &request.tls.ca {
            let cert = Certificate::from_pem(ca).map_err(|e| tls_error("ca", &e))?;
            builder = builder.add_root_certificate(cert);
        }

        match (&request.tls.cert, &request.tls.key) {
            (Some(cert), Some(key)) => {
                let mut pem = cert.to_vec();
                if !pem.ends_with(b"\n") {
                    pem.push(b'\n');
                }
                pem.extend_from_slice(key);
                let identity = Identity::from_pem(&pem).map_err(|e| tls_error("cert", &e))?;
                builder = builder.identity(identity);
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(TransportError::new(
                    "client certificate and key must be given together",
                ))
            }
            (None, None) => {}
        }

        builder
            .build()
            .map_err(|e| TransportError::new(e.to_string()))
    }
}

fn tls_error(field: &str, err: &reqwest::Error) -> TransportError {
    TransportError::new(format!("invalid {}: {}", field, err)).with("code", "ERR_TLS_MATERIAL")
}

/// Map a client error onto a transport error with conventional attributes
fn transport_error(err: &reqwest::Error, request: &RequestDescriptor) -> TransportError {
    let chain = error_chain(err);

    let mapped = if err.is_timeout() {
        TransportError::timed_out(&request.host, request.port)
    } else if chain.contains("dns error") || chain.contains("failed to lookup address") {
        TransportError::new(format!("getaddrinfo ENOTFOUND {}", request.host))
            .with("code", "ENOTFOUND")
            .with("syscall", "getaddrinfo")
    } else if chain.contains("connection closed before message completed") {
        TransportError::socket_hang_up()
    } else {
        match find_io_error(err) {
            Some(io) if io.kind() == io::ErrorKind::ConnectionRefused => TransportError::new(
                format!("connect ECONNREFUSED {}:{}", request.host, request.port),
            )
            .with("code", "ECONNREFUSED")
            .with("syscall", "connect"),
            Some(io)
                if matches!(
                    io.kind(),
                    io::ErrorKind::ConnectionReset | io::ErrorKind::UnexpectedEof
                ) =>
            {
                TransportError::socket_hang_up()
            }
            Some(io) => TransportError::from_io(io),
            None => TransportError::new(chain),
        }
    };

    mapped
        .with("host", request.host.clone())
        .with("port", request.port)
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

fn find_io_error(err: &reqwest::Error) -> Option<&io::Error> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            return Some(io);
        }
        source = cause.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn recorder() -> Recorder {
        Recorder::new(&SessionConfig::new()).unwrap()
    }

    #[tokio::test]
    async fn test_forward_captures_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-thing", "yes")
                    .set_body_raw(r#"{"foo":"bar"}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let request = RequestDescriptor::new("GET", &format!("{}/thing", server.uri())).unwrap();
        let response = recorder().forward(&request).await;
        let message = response.message().unwrap();

        assert_eq!(message.status, 200);
        assert_eq!(message.headers.get("x-thing"), Some("yes"));
        assert_eq!(message.headers.original_name("x-thing"), Some("X-Thing"));
        assert_eq!(message.body.json_value(), Some(serde_json::json!({"foo": "bar"})));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let request = RequestDescriptor::new("GET", &format!("http://127.0.0.1:{}/", port)).unwrap();
        let response = recorder().forward(&request).await;
        let err = response.error().unwrap();

        assert_eq!(err.code(), Some("ECONNREFUSED"));
        assert_eq!(err.attributes.get("port"), Some(&serde_json::json!(port)));
    }

    #[tokio::test]
    async fn test_socket_hang_up() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.shutdown().await;
            }
        });

        let request = RequestDescriptor::new("GET", &format!("http://127.0.0.1:{}/", port)).unwrap();
        let response = recorder().forward(&request).await;
        let err = response.error().unwrap();

        assert_eq!(err.message, "socket hang up");
        assert_eq!(err.code(), Some("ECONNRESET"));
    }
}
