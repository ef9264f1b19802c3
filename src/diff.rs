// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Diff rendering
//!
//! Turns match reports and captured traffic into the annotated, HTTP-shaped
//! text that failures carry as their message. Annotations are `//` comments
//! appended to the offending line, with continuation lines aligned under the
//! first `//`.

use crate::body::render_body;
use crate::matcher::{
    BodyOutcome, BodySpec, FieldOutcome, MismatchReport, RequestSpec, ResponseReport, ValueSpec,
};
use crate::model::{
    Headers, PreparedEntry, PreparedResponse, RequestDescriptor, ResponseDescriptor,
};

/// One block of rendered traffic
#[derive(Debug, Clone, Copy)]
pub enum TrafficItem<'a> {
    /// A request with what it received
    Exchange {
        request: &'a RequestDescriptor,
        response: &'a ResponseDescriptor,
    },
    /// A request that failed its expectation, with the response the entry would give
    Mismatch {
        report: &'a MismatchReport,
        response: Option<&'a PreparedResponse>,
    },
    /// A request no expectation was left for
    Unexpected { request: &'a RequestDescriptor },
    /// An expectation that never saw its request
    Missing { entry: &'a PreparedEntry },
}

/// Render a sequence of traffic blocks separated by blank lines
pub fn render_traffic(items: &[TrafficItem<'_>]) -> String {
    let blocks: Vec<String> = items
        .iter()
        .map(|item| {
            let lines = match item {
                TrafficItem::Exchange { request, response } => {
                    join_sections(render_request(request), render_response(response))
                }
                TrafficItem::Mismatch { report, response } => join_sections(
                    render_mismatch(report),
                    response.map(render_prepared).unwrap_or_default(),
                ),
                TrafficItem::Unexpected { request } => {
                    let mut lines = vec!["// should be removed:".to_string()];
                    lines.extend(commented(&render_request(request)));
                    lines.push("//".to_string());
                    lines.push("// <no response>".to_string());
                    lines
                }
                TrafficItem::Missing { entry } => {
                    let mut lines = vec!["// missing:".to_string()];
                    lines.extend(commented(&join_sections(
                        render_spec(entry.request.as_ref()),
                        render_prepared(&entry.response),
                    )));
                    lines
                }
            };
            lines.join("\n")
        })
        .collect();
    blocks.join("\n\n")
}

fn join_sections(mut head: Vec<String>, tail: Vec<String>) -> Vec<String> {
    if !tail.is_empty() {
        head.push(String::new());
        head.extend(tail);
    }
    head
}

fn commented(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                "//".to_string()
            } else {
                format!("// {}", line)
            }
        })
        .collect()
}

/// Append annotation notes to a line, aligning continuation notes under the first
fn annotate(line: &str, notes: &[String]) -> Vec<String> {
    let Some((first, rest)) = notes.split_first() else {
        return vec![line.to_string()];
    };
    let pad = " ".repeat(line.chars().count() + 1);
    let mut out = vec![format!("{} // {}", line, first)];
    for note in rest {
        if note.is_empty() {
            out.push(format!("{}//", pad));
        } else {
            out.push(format!("{}// {}", pad, note));
        }
    }
    out
}

/// `to match /x/` reads as `should match /x/`
fn should(expectation: &str) -> String {
    match expectation.strip_prefix("to ") {
        Some(rest) => format!("should {}", rest),
        None => format!("should satisfy {}", expectation),
    }
}

fn header_lines(headers: &Headers) -> Vec<String> {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect()
}

/// Plain HTTP/1.1 rendering of a request
pub fn render_request(request: &RequestDescriptor) -> Vec<String> {
    let mut lines = vec![request.request_line()];
    lines.extend(header_lines(&request.headers));
    join_sections(
        lines,
        render_body(&request.body, request.headers.content_type()),
    )
}

/// Plain rendering of a delivered response or transport error
pub fn render_response(response: &ResponseDescriptor) -> Vec<String> {
    match response {
        ResponseDescriptor::Message(message) => {
            let mut lines = vec![message.status_line()];
            lines.extend(header_lines(&message.headers));
            join_sections(
                lines,
                render_body(&message.body, message.headers.content_type()),
            )
        }
        ResponseDescriptor::Error(err) => vec![format!("// error: {}", err)],
    }
}

/// Rendering of an entry's prepared response
pub fn render_prepared(response: &PreparedResponse) -> Vec<String> {
    match response {
        PreparedResponse::Message(message) => {
            render_response(&ResponseDescriptor::Message(message.clone()))
        }
        PreparedResponse::Error(err) => vec![format!("// error: {}", err)],
        PreparedResponse::Synthesized(_) => vec!["// <response synthesized by a function>".to_string()],
    }
}

/// Readable form of a request expectation
pub fn render_spec(spec: Option<&RequestSpec>) -> Vec<String> {
    let Some(spec) = spec else {
        return vec!["<any request>".to_string()];
    };

    let mut first = match (&spec.method, &spec.path) {
        (Some(method), Some(path)) => format!("{} {}", method, path),
        (Some(method), None) => method.clone(),
        (None, Some(path)) => path.clone(),
        (None, None) => "<any request>".to_string(),
    };
    if let Some(p) = &spec.predicate {
        first.push_str(&format!(" // {}", should(&p.describe())));
    }

    let mut lines = vec![first];
    for (name, value) in &spec.headers {
        lines.push(match value {
            ValueSpec::Exact(v) => format!("{}: {}", name, v),
            ValueSpec::Predicate(p) => format!("{}: // {}", name, should(&p.describe())),
        });
    }

    let body = match &spec.body {
        None => Vec::new(),
        Some(BodySpec::Predicate(p)) => vec![format!("// body {}", should(&p.describe()))],
        Some(BodySpec::Exact(source)) => match crate::body::canonicalize_expected(source) {
            Ok(body) => render_body(&body, spec.exact_header("content-type")),
            Err(_) => vec!["// <stream>".to_string()],
        },
    };
    join_sections(lines, body)
}

fn field_notes(name: &str, outcome: &FieldOutcome) -> Option<String> {
    match outcome {
        FieldOutcome::Ok => None,
        FieldOutcome::Differs { expected, actual } => Some(format!(
            "// {}: expected '{}' to equal '{}'",
            name, actual, expected
        )),
        FieldOutcome::Failed { reason, .. } => Some(format!("// {}", reason)),
        FieldOutcome::Missing { expected } => {
            Some(format!("// {}: missing, expected '{}'", name, expected))
        }
        FieldOutcome::Extra => Some(format!("// {}: should be removed", name)),
    }
}

fn header_annotation(line: &str, actual: &str, outcome: &FieldOutcome) -> Vec<String> {
    match outcome {
        FieldOutcome::Ok => vec![line.to_string()],
        FieldOutcome::Differs { expected, .. } => annotate(
            line,
            &[
                format!("should equal {}", expected),
                String::new(),
                format!("-{}", actual),
                format!("+{}", expected),
            ],
        ),
        FieldOutcome::Failed {
            expectation,
            reason,
        } => annotate(line, &[should(expectation), reason.clone()]),
        FieldOutcome::Extra => annotate(line, &["should be removed".to_string()]),
        FieldOutcome::Missing { .. } => vec![line.to_string()],
    }
}

fn body_lines(actual: Vec<String>, outcome: &BodyOutcome) -> Vec<String> {
    match outcome {
        BodyOutcome::Ok => actual,
        BodyOutcome::Json(lines) => lines.clone(),
        BodyOutcome::Differs { expected } => {
            let mut lines = actual;
            lines.push("// should equal".to_string());
            lines.extend(commented(expected));
            lines
        }
        BodyOutcome::Failed {
            expectation,
            reason,
        } => {
            let mut lines = actual;
            lines.push(format!("// {}", should(expectation)));
            lines.push(format!("// {}", reason));
            lines
        }
    }
}

/// Annotated rendering of a request that failed its expectation
pub fn render_mismatch(report: &MismatchReport) -> Vec<String> {
    let request = &report.request;
    let line = request.request_line();

    let mut lines = match &report.expected_line {
        Some(expected) => annotate(
            &line,
            &[
                format!("should be {}", expected.trim_end_matches(" HTTP/1.1")),
                String::new(),
                format!("-{}", line),
                format!("+{}", expected),
            ],
        ),
        None => vec![line],
    };

    let fields = [
        ("host", &report.host),
        ("port", &report.port),
        ("encrypted", &report.encrypted),
        ("rejectUnauthorized", &report.reject_unauthorized),
    ];
    lines.extend(fields.iter().filter_map(|(name, o)| field_notes(name, o)));
    lines.extend(
        report
            .tls
            .iter()
            .filter_map(|(name, o)| field_notes(name, o)),
    );
    if let FieldOutcome::Failed {
        expectation,
        reason,
    } = &report.predicate
    {
        lines.push(format!("// {}", should(expectation)));
        lines.push(format!("// {}", reason));
    }

    for (name, value) in request.headers.iter() {
        let header = format!("{}: {}", name, value);
        match report.header(name) {
            Some(outcome) => lines.extend(header_annotation(&header, value, outcome)),
            None => lines.push(header),
        }
    }
    for h in &report.headers {
        if let FieldOutcome::Missing { expected } = &h.outcome {
            lines.push(format!("// missing {}: {}", h.name, expected));
        }
    }

    let body = body_lines(
        render_body(&request.body, request.headers.content_type()),
        &report.body,
    );
    join_sections(lines, body)
}

/// Annotated rendering of a mocked response compared with the live one
pub fn render_response_report(report: &ResponseReport) -> Vec<String> {
    let message = match (&report.mock, &report.error) {
        (ResponseDescriptor::Message(message), FieldOutcome::Ok) => message,
        (mock, FieldOutcome::Ok) => return render_response(mock),
        (_, FieldOutcome::Differs { expected, actual }) => {
            return annotate(
                &format!("// error: {}", actual),
                &[format!("should be {}", expected)],
            );
        }
        (mock, outcome) => {
            let mut lines = render_response(mock);
            if let FieldOutcome::Failed { reason, .. } = outcome {
                lines.push(format!("// {}", reason));
            }
            return lines;
        }
    };

    let line = message.status_line();
    let mut lines = match &report.status {
        FieldOutcome::Differs { expected, .. } => annotate(
            &line,
            &[
                format!("should be {}", expected.trim_start_matches("HTTP/1.1 ")),
                String::new(),
                format!("-{}", line),
                format!("+{}", expected),
            ],
        ),
        _ => vec![line],
    };

    for (name, value) in message.headers.iter() {
        let header = format!("{}: {}", name, value);
        match report.header(name) {
            Some(outcome) => lines.extend(header_annotation(&header, value, outcome)),
            None => lines.push(header),
        }
    }
    for h in &report.headers {
        if let FieldOutcome::Missing { expected } = &h.outcome {
            lines.push(format!("// missing {}: {}", h.name, expected));
        }
    }

    let body = body_lines(
        render_body(&message.body, message.headers.content_type()),
        &report.body,
    );
    join_sections(lines, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::matcher::match_request;
    use crate::model::{ResponseMessage, TransportError, VerifyOptions};
    use serde_json::json;

    fn request(method: &str, url: &str) -> RequestDescriptor {
        let mut req = RequestDescriptor::new(method, url).unwrap();
        req.headers = Headers::new().with("Host", req.host_header());
        req
    }

    #[tokio::test]
    async fn test_request_line_diff() {
        let report = match_request(&RequestSpec::parse("GET /bar"), &request("GET", "http://localhost/foo"))
            .await
            .unwrap();
        let pad = " ".repeat(18);
        let expected = vec![
            "GET /foo HTTP/1.1 // should be GET /bar".to_string(),
            format!("{}//", pad),
            format!("{}// -GET /foo HTTP/1.1", pad),
            format!("{}// +GET /bar HTTP/1.1", pad),
            "Host: localhost".to_string(),
        ];
        assert_eq!(render_mismatch(&report), expected);
    }

    #[tokio::test]
    async fn test_header_diff() {
        let report = match_request(
            &RequestSpec::any().header("Host", "example.com"),
            &request("GET", "http://localhost/"),
        )
        .await
        .unwrap();
        let lines = render_mismatch(&report);
        assert_eq!(lines[1], "Host: localhost // should equal example.com");
        let pad = " ".repeat(16);
        assert_eq!(lines[2], format!("{}//", pad));
        assert_eq!(lines[3], format!("{}// -localhost", pad));
        assert_eq!(lines[4], format!("{}// +example.com", pad));
    }

    #[tokio::test]
    async fn test_json_body_diff_in_request() {
        let mut actual = request("POST", "http://localhost/");
        actual.headers.append("Content-Type", "application/json");
        actual.body = Body::json(&json!({"foo": 123}));
        let report = match_request(&RequestSpec::any().body(json!({"foo": 456})), &actual)
            .await
            .unwrap();
        let rendered = render_mismatch(&report).join("\n");
        assert!(rendered.ends_with("{\n  \"foo\": 123 // should equal 456\n}"));
    }

    #[test]
    fn test_missing_block() {
        let entry = PreparedEntry {
            index: 1,
            request: Some(RequestSpec::parse("GET /foo")),
            response: PreparedResponse::Message(ResponseMessage::new(200)),
            verify: VerifyOptions::default(),
        };
        let rendered = render_traffic(&[TrafficItem::Missing { entry: &entry }]);
        assert_eq!(rendered, "// missing:\n// GET /foo\n//\n// HTTP/1.1 200 OK");
    }

    #[test]
    fn test_unexpected_block() {
        let req = request("GET", "http://localhost/");
        let rendered = render_traffic(&[TrafficItem::Unexpected { request: &req }]);
        assert_eq!(
            rendered,
            "// should be removed:\n// GET / HTTP/1.1\n// Host: localhost\n//\n// <no response>"
        );
    }

    #[test]
    fn test_error_response() {
        let lines = render_response(&TransportError::socket_hang_up().into());
        assert_eq!(lines, vec!["// error: socket hang up (ECONNRESET)"]);
    }
}
