// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Fixture files
//!
//! Recorded exchanges persist as a JSON array of expectation entries:
//!
//! ```json
//! [
//!   {
//!     "request": {"url": "GET /", "host": "localhost", "port": 80, "headers": {"Host": "localhost"}},
//!     "response": {"statusCode": 200, "headers": {"Content-Type": "text/plain"}, "body": "hello"},
//!     "verify": {"response": {"ignoreHeaders": ["ETag"]}}
//!   }
//! ]
//! ```
//!
//! Body literals: text is a string, a JSON object or array is written inline,
//! a JSON scalar is `{"$json": v}`, binary up to 32 bytes is
//! `{"$bytes": [..]}` and longer binary is `{"$base64": ".."}`. Request-side
//! headers and bodies may also be `{"$predicate": name, "value": v}`.

mod injector;
mod writer;

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Map, Value};

use crate::body::{Body, BodySource, Decoded, INLINE_BYTES_LIMIT};
use crate::error::{Error, ErrorContext, Result};
use crate::matcher::{named, BodySpec, RequestSpec, ValueSpec};
use crate::model::{
    ExpectationEntry, Headers, RecordedEntry, RequestDescriptor, ResponseDescriptor,
    ResponseMessage, ResponseSpec, TransportError, VerifyOptions,
};

pub use injector::{inject, inject_source, raw_string_literal};
pub use writer::{append, write};

const INLINE_SOURCE: &str = "<inline>";

/// Read and parse a fixture file
pub fn read(path: &Path) -> Result<Vec<ExpectationEntry>> {
    let text = std::fs::read_to_string(path).with_fixture(path)?;
    let entries = parse_at(&text, path)?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "Fixture loaded");
    Ok(entries)
}

/// Parse fixture JSON (an array of entries, or a single entry)
pub fn parse(text: &str) -> Result<Vec<ExpectationEntry>> {
    parse_at(text, Path::new(INLINE_SOURCE))
}

fn parse_at(text: &str, path: &Path) -> Result<Vec<ExpectationEntry>> {
    let value: Value = serde_json::from_str(text).with_fixture(path)?;
    from_value(&value).map_err(|err| match err {
        Error::Fixture { reason, .. } => Error::fixture(path, reason),
        other => other,
    })
}

/// Decode entries from a parsed fixture document
pub fn from_value(value: &Value) -> Result<Vec<ExpectationEntry>> {
    match value {
        Value::Array(items) => items.iter().map(entry_from_value).collect(),
        Value::Object(_) => Ok(vec![entry_from_value(value)?]),
        other => Err(invalid(format!("expected an entry or a list of entries, got {}", other))),
    }
}

/// Encode recorded exchanges as a fixture document
pub fn to_value(entries: &[RecordedEntry]) -> Result<Value> {
    entries
        .iter()
        .map(recorded_to_value)
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// Pretty-printed fixture text, newline terminated
pub fn to_json(entries: &[RecordedEntry]) -> Result<String> {
    let mut text = serde_json::to_string_pretty(&to_value(entries)?)?;
    text.push('\n');
    Ok(text)
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::fixture(INLINE_SOURCE, reason)
}

// ---------------------------------------------------------------------------
// Encoding

fn recorded_to_value(entry: &RecordedEntry) -> Result<Value> {
    Ok(json!({
        "request": request_to_value(&entry.request)?,
        "response": response_to_value(&entry.response)?,
    }))
}

fn request_to_value(request: &RequestDescriptor) -> Result<Value> {
    let mut obj = Map::new();
    obj.insert(
        "url".into(),
        Value::String(format!("{} {}", request.method, request.path)),
    );
    obj.insert("host".into(), Value::String(request.host.clone()));
    obj.insert("port".into(), Value::from(request.port));
    if request.is_encrypted() {
        obj.insert("encrypted".into(), Value::Bool(true));
    }
    if !request.headers.is_empty() {
        obj.insert("headers".into(), serde_json::to_value(&request.headers)?);
    }
    if let Some(body) = body_to_value(&request.body, request.headers.content_type()) {
        obj.insert("body".into(), body);
    }
    for (name, field) in request.tls.fields() {
        if let Some(bytes) = field {
            obj.insert(name.into(), material_to_value(bytes));
        }
    }
    if let Some(reject) = request.reject_unauthorized {
        obj.insert("rejectUnauthorized".into(), Value::Bool(reject));
    }
    Ok(Value::Object(obj))
}

fn response_to_value(response: &ResponseDescriptor) -> Result<Value> {
    match response {
        ResponseDescriptor::Error(err) => {
            let mut obj = Map::new();
            obj.insert("message".into(), Value::String(err.message.clone()));
            for (key, value) in &err.attributes {
                obj.insert(key.clone(), value.clone());
            }
            Ok(json!({ "$error": obj }))
        }
        ResponseDescriptor::Message(message) => message_to_value(message),
    }
}

fn message_to_value(message: &ResponseMessage) -> Result<Value> {
    if message.headers.is_empty() && message.body.is_empty() {
        return Ok(Value::from(message.status));
    }

    let mut obj = Map::new();
    obj.insert("statusCode".into(), Value::from(message.status));
    if !message.headers.is_empty() {
        obj.insert("headers".into(), serde_json::to_value(&message.headers)?);
    }
    if let Some(body) = body_to_value(&message.body, message.headers.content_type()) {
        obj.insert("body".into(), body);
    }
    Ok(Value::Object(obj))
}

/// Literal form of a canonical body; `None` for an empty body
pub fn body_to_value(body: &Body, content_type: Option<&str>) -> Option<Value> {
    let bytes = body.as_bytes();
    match body.decode_with(content_type) {
        Decoded::Empty => None,
        Decoded::Json(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        Decoded::Json(scalar) => Some(json!({ "$json": scalar })),
        Decoded::Text(_) | Decoded::InvalidJson(_) => Some(match std::str::from_utf8(bytes) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => bytes_to_value(bytes),
        }),
        Decoded::Bytes(raw) => Some(bytes_to_value(raw)),
    }
}

/// `{"$bytes": [..]}` up to the inline limit, `{"$base64": ".."}` beyond
pub fn bytes_to_value(bytes: &[u8]) -> Value {
    if bytes.len() <= INLINE_BYTES_LIMIT {
        json!({ "$bytes": bytes })
    } else {
        json!({ "$base64": STANDARD.encode(bytes) })
    }
}

fn material_to_value(bytes: &Bytes) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => bytes_to_value(bytes),
    }
}

// ---------------------------------------------------------------------------
// Decoding

fn entry_from_value(value: &Value) -> Result<ExpectationEntry> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(format!("entry must be an object, got {}", value)))?;

    let response = match obj.get("response") {
        Some(response) => response_from_value(response)?,
        None => return Err(invalid("entry has no response")),
    };

    let request = match obj.get("request") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(RequestSpec::parse(text)),
        Some(Value::Object(req)) => Some(request_from_object(req)?),
        Some(other) => return Err(invalid(format!("invalid request: {}", other))),
    };

    let ignore_headers = obj
        .get("verify")
        .and_then(|v| v.pointer("/response/ignoreHeaders"))
        .map(|list| {
            list.as_array()
                .ok_or_else(|| invalid("verify.response.ignoreHeaders must be a list"))?
                .iter()
                .map(|name| {
                    name.as_str()
                        .map(String::from)
                        .ok_or_else(|| invalid(format!("invalid ignored header: {}", name)))
                })
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    Ok(ExpectationEntry {
        request,
        response,
        verify: VerifyOptions { ignore_headers },
    })
}

fn request_from_object(obj: &Map<String, Value>) -> Result<RequestSpec> {
    let mut spec = match obj.get("url") {
        None => RequestSpec::any(),
        Some(Value::String(url)) => RequestSpec::parse(url),
        Some(other) => return Err(invalid(format!("request url must be a string, got {}", other))),
    };

    if let Some(method) = obj.get("method").and_then(Value::as_str) {
        spec = spec.method(method);
    }
    if let Some(host) = obj.get("host") {
        spec.host = Some(
            host.as_str()
                .ok_or_else(|| invalid(format!("invalid host: {}", host)))?
                .to_string(),
        );
    }
    if let Some(port) = obj.get("port") {
        let port = port
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .ok_or_else(|| invalid(format!("invalid port: {}", port)))?;
        spec.port = Some(port);
    }
    if let Some(encrypted) = obj.get("encrypted") {
        spec.encrypted = Some(
            encrypted
                .as_bool()
                .ok_or_else(|| invalid(format!("invalid encrypted flag: {}", encrypted)))?,
        );
    }

    if let Some(headers) = obj.get("headers") {
        let headers = headers
            .as_object()
            .ok_or_else(|| invalid("request headers must be an object"))?;
        for (name, value) in headers {
            spec = spec.header(name.clone(), header_spec(name, value)?);
        }
    }

    if let Some(body) = obj.get("body") {
        spec.body = Some(match predicate_from_value(body)? {
            Some(predicate) => BodySpec::Predicate(predicate),
            None => BodySpec::Exact(body_from_value(body)?),
        });
    }

    for name in ["cert", "key", "ca"] {
        if let Some(value) = obj.get(name) {
            let bytes = material_from_value(value)?;
            spec = match name {
                "cert" => spec.cert(bytes),
                "key" => spec.key(bytes),
                _ => spec.ca(bytes),
            };
        }
    }

    if let Some(reject) = obj.get("rejectUnauthorized") {
        spec.reject_unauthorized = Some(
            reject
                .as_bool()
                .ok_or_else(|| invalid(format!("invalid rejectUnauthorized: {}", reject)))?,
        );
    }

    Ok(spec)
}

fn header_spec(name: &str, value: &Value) -> Result<ValueSpec> {
    if let Some(predicate) = predicate_from_value(value)? {
        return Ok(ValueSpec::Predicate(predicate));
    }
    match value {
        Value::String(s) => Ok(ValueSpec::Exact(s.clone())),
        Value::Number(n) => Ok(ValueSpec::Exact(n.to_string())),
        Value::Array(values) => values
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(invalid(format!("invalid value for header {}: {}", name, other))),
            })
            .collect::<Result<Vec<_>>>()
            .map(|values| ValueSpec::Exact(values.join(", "))),
        other => Err(invalid(format!("invalid value for header {}: {}", name, other))),
    }
}

/// `{"$predicate": name, "value": v}`; unknown names are fatal
fn predicate_from_value(value: &Value) -> Result<Option<crate::matcher::SharedPredicate>> {
    let Some(obj) = value.as_object() else {
        return Ok(None);
    };
    let Some(name) = obj.get("$predicate") else {
        return Ok(None);
    };
    let name = name
        .as_str()
        .ok_or_else(|| Error::predicate(format!("predicate name must be a string, got {}", name)))?;
    let operand = obj.get("value").cloned().unwrap_or(Value::Null);
    named(name, operand).map(Some)
}

fn response_from_value(value: &Value) -> Result<ResponseSpec> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|s| u16::try_from(s).ok())
            .map(ResponseSpec::Status)
            .ok_or_else(|| invalid(format!("invalid status code: {}", n))),
        Value::Object(obj) => {
            if let Some(err) = obj.get("$error") {
                return error_from_value(err).map(ResponseSpec::Error);
            }

            let status = match obj.get("statusCode") {
                None => 200,
                Some(code) => code
                    .as_u64()
                    .and_then(|s| u16::try_from(s).ok())
                    .ok_or_else(|| invalid(format!("invalid status code: {}", code)))?,
            };
            let headers: Headers = match obj.get("headers") {
                None => Headers::new(),
                Some(headers) => serde_json::from_value(headers.clone())
                    .map_err(|e| invalid(format!("invalid response headers: {}", e)))?,
            };
            let body = match obj.get("body") {
                None => BodySource::Empty,
                Some(body) => body_from_value(body)?,
            };
            Ok(ResponseSpec::Message {
                status,
                headers,
                body,
            })
        }
        other => Err(invalid(format!("invalid response: {}", other))),
    }
}

fn error_from_value(value: &Value) -> Result<TransportError> {
    match value {
        Value::String(message) => Ok(TransportError::new(message.clone())),
        Value::Object(obj) => {
            let mut err = TransportError::new(
                obj.get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
            );
            for (key, value) in obj {
                if key != "message" {
                    err = err.with(key.clone(), value.clone());
                }
            }
            Ok(err)
        }
        other => Err(invalid(format!("invalid $error: {}", other))),
    }
}

/// Body literal to a body source
pub fn body_from_value(value: &Value) -> Result<BodySource> {
    match value {
        Value::String(text) => Ok(BodySource::Text(text.clone())),
        Value::Object(obj) if obj.contains_key("$predicate") => Err(invalid(
            "a predicate cannot describe a response body",
        )),
        Value::Object(obj) if obj.len() == 1 && obj.contains_key("$json") => {
            Ok(BodySource::Json(obj["$json"].clone()))
        }
        Value::Object(obj) if obj.len() == 1 && obj.contains_key("$bytes") => {
            bytes_from_list(&obj["$bytes"]).map(BodySource::Bytes)
        }
        Value::Object(obj) if obj.len() == 1 && obj.contains_key("$base64") => {
            bytes_from_base64(&obj["$base64"]).map(BodySource::Bytes)
        }
        other => Ok(BodySource::Json(other.clone())),
    }
}

fn material_from_value(value: &Value) -> Result<Bytes> {
    match value {
        Value::String(text) => Ok(Bytes::from(text.clone())),
        Value::Object(obj) if obj.contains_key("$bytes") => bytes_from_list(&obj["$bytes"]),
        Value::Object(obj) if obj.contains_key("$base64") => bytes_from_base64(&obj["$base64"]),
        other => Err(invalid(format!("invalid TLS material: {}", other))),
    }
}

fn bytes_from_list(value: &Value) -> Result<Bytes> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid("$bytes must be a list of byte values"))?;
    items
        .iter()
        .map(|b| {
            b.as_u64()
                .and_then(|b| u8::try_from(b).ok())
                .ok_or_else(|| invalid(format!("invalid byte value: {}", b)))
        })
        .collect::<Result<Vec<u8>>>()
        .map(Bytes::from)
}

fn bytes_from_base64(value: &Value) -> Result<Bytes> {
    let text = value
        .as_str()
        .ok_or_else(|| invalid("$base64 must be a string"))?;
    STANDARD
        .decode(text)
        .map(Bytes::from)
        .map_err(|e| invalid(format!("invalid base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyKind;
    use crate::matcher::match_request;

    fn recorded(request: RequestDescriptor, response: ResponseDescriptor) -> RecordedEntry {
        RecordedEntry { request, response }
    }

    #[test]
    fn test_short_binary_as_byte_list() {
        let body = Body::with_kind(vec![0x66u8, 0x6f, 0x6f, 0xff], BodyKind::Binary);
        assert_eq!(
            body_to_value(&body, None),
            Some(json!({"$bytes": [0x66, 0x6f, 0x6f, 0xff]}))
        );
    }

    #[test]
    fn test_long_binary_as_base64() {
        let bytes: Vec<u8> = (0..40u8).collect();
        let value = bytes_to_value(&bytes);
        assert!(value.get("$base64").is_some());
        match body_from_value(&value).unwrap() {
            BodySource::Bytes(decoded) => assert_eq!(decoded.as_ref(), bytes.as_slice()),
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_json_scalar_wrapped() {
        let body = Body::with_kind("123", BodyKind::Json);
        assert_eq!(body_to_value(&body, None), Some(json!({"$json": 123})));
        assert!(matches!(body_from_value(&json!({"$json": 123})).unwrap(), BodySource::Json(v) if v == json!(123)));
    }

    #[test]
    fn test_error_response_round_trip() {
        let err = TransportError::socket_hang_up().with("host", "localhost");
        let value = response_to_value(&ResponseDescriptor::Error(err.clone())).unwrap();
        assert_eq!(
            value,
            json!({"$error": {"message": "socket hang up", "code": "ECONNRESET", "host": "localhost"}})
        );
        assert!(matches!(response_from_value(&value).unwrap(), ResponseSpec::Error(e) if e == err));
    }

    #[test]
    fn test_status_shorthand() {
        let entries = parse(r#"[{"request": "GET /", "response": 200}]"#).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0].response, ResponseSpec::Status(200)));
        assert_eq!(entries[0].request.as_ref().unwrap().path.as_deref(), Some("/"));
    }

    #[test]
    fn test_verify_options() {
        let entries = parse(
            r#"{"request": "GET /", "response": 200, "verify": {"response": {"ignoreHeaders": ["ETag"]}}}"#,
        )
        .unwrap();
        assert_eq!(entries[0].verify.ignore_headers, vec!["ETag".to_string()]);
    }

    #[test]
    fn test_unknown_predicate_is_fatal() {
        let err = parse(
            r#"[{"request": {"url": "GET /", "headers": {"X-A": {"$predicate": "isPrime"}}}, "response": 200}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Predicate(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_malformed_json() {
        let err = parse("[{").unwrap_err();
        assert!(matches!(err, Error::Fixture { .. }));
    }

    #[tokio::test]
    async fn test_recorded_request_round_trip() {
        let request = RequestDescriptor::new("POST", "https://api.example.com:8443/items?x=1")
            .unwrap()
            .with_headers(
                Headers::new()
                    .with("Host", "api.example.com:8443")
                    .with("Content-Type", "application/json"),
            )
            .with_body(Body::infer(r#"{"name": "foo"}"#, Some("application/json")));
        let response = ResponseMessage {
            status: 201,
            headers: Headers::new().with("Content-Type", "text/plain"),
            body: Body::text("created"),
        };

        let value = to_value(&[recorded(request.clone(), response.into())]).unwrap();
        let entries = from_value(&value).unwrap();
        let spec = entries[0].request.as_ref().unwrap();

        assert!(match_request(spec, &request).await.unwrap().is_match());
        assert_eq!(spec.encrypted, Some(true));
        assert!(matches!(
            &entries[0].response,
            ResponseSpec::Message { status: 201, body: BodySource::Text(t), .. } if t == "created"
        ));
    }

    #[test]
    fn test_tls_material_as_text() {
        let request = RequestDescriptor {
            tls: crate::model::TlsMaterial {
                cert: Some(Bytes::from_static(b"-----BEGIN CERTIFICATE-----")),
                key: None,
                ca: None,
            },
            reject_unauthorized: Some(false),
            ..RequestDescriptor::new("GET", "https://localhost/").unwrap()
        };
        let value = request_to_value(&request).unwrap();
        assert_eq!(value["cert"], json!("-----BEGIN CERTIFICATE-----"));
        assert_eq!(value["rejectUnauthorized"], json!(false));

        let spec = request_from_object(value.as_object().unwrap()).unwrap();
        assert_eq!(spec.tls.cert.as_deref(), Some(&b"-----BEGIN CERTIFICATE-----"[..]));
        assert_eq!(spec.reject_unauthorized, Some(false));
    }
}
