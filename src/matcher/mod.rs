// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request matching
//!
//! Compares an observed request with its expectation field by field. Every
//! predicate involved is settled before the verdict, so matching suspends
//! until the slowest asynchronous check answers. Mismatches are data, not
//! errors: only an unusable predicate or a non-replayable expected body
//! makes `match_request` fail.

mod json_diff;
mod predicate;
mod report;
mod spec;

use futures::future::{join_all, BoxFuture};
use serde_json::Value;

use crate::body::{canonicalize_expected, pretty_json, render_body, Body, BodyKind, BodySource};
use crate::error::{Error, Result};
use crate::model::{RequestDescriptor, ResponseDescriptor, ResponseMessage, TransportError};

pub use json_diff::diff_json;
pub use predicate::{
    contains, ends_with, equals, eventually, matches, named, satisfy, starts_with, Evaluation,
    Predicate, SharedPredicate, Subject, Verdict,
};
pub use report::{BodyOutcome, FieldOutcome, HeaderOutcome, MismatchReport, ResponseReport};
pub use spec::{BodySpec, RequestSpec, ValueSpec};

/// Where a suspended verdict lands once it settles
enum Slot {
    Header(usize),
    Body,
    Request,
}

struct Pending {
    slot: Slot,
    expectation: String,
    verdict: BoxFuture<'static, Verdict>,
}

/// Match an observed request against an expectation
pub async fn match_request(spec: &RequestSpec, actual: &RequestDescriptor) -> Result<MismatchReport> {
    let mut report = MismatchReport::new(actual.clone());
    let mut pending = Vec::new();

    if let Some(method) = &spec.method {
        if method != &actual.method {
            report.method = differs(method, &actual.method);
        }
    }
    if let Some(path) = &spec.path {
        if path != &actual.path {
            report.path = differs(path, &actual.path);
        }
    }
    if !report.method.is_ok() || !report.path.is_ok() {
        report.expected_line = Some(format!(
            "{} {} HTTP/1.1",
            spec.method.as_deref().unwrap_or(&actual.method),
            spec.path.as_deref().unwrap_or(&actual.path)
        ));
    }

    if let Some(host) = &spec.host {
        if !host.eq_ignore_ascii_case(&actual.host) {
            report.host = differs(host, &actual.host);
        }
    }
    if let Some(port) = spec.port {
        if port != actual.port {
            report.port = differs(port, actual.port);
        }
    }
    match spec.encrypted {
        Some(true) if !actual.is_encrypted() => {
            report.encrypted = FieldOutcome::Failed {
                expectation: "encrypted".to_string(),
                reason: "expected an encrypted request".to_string(),
            }
        }
        Some(false) if actual.is_encrypted() => {
            report.encrypted = FieldOutcome::Failed {
                expectation: "unencrypted".to_string(),
                reason: "expected an unencrypted request".to_string(),
            }
        }
        _ => {}
    }

    for (name, expected) in &spec.headers {
        let values = actual.headers.get_all(name);
        let index = report.headers.len();
        let outcome = if values.is_empty() {
            FieldOutcome::Missing {
                expected: match expected {
                    ValueSpec::Exact(v) => v.clone(),
                    ValueSpec::Predicate(p) => p.describe(),
                },
            }
        } else {
            let value = values.join(", ");
            match expected {
                ValueSpec::Exact(v) if v == &value => FieldOutcome::Ok,
                ValueSpec::Exact(v) => differs(v, &value),
                ValueSpec::Predicate(p) => settle_now(
                    p.evaluate(Subject::Text(value)),
                    Slot::Header(index),
                    p.describe(),
                    &mut pending,
                )?,
            }
        };
        report.headers.push(HeaderOutcome {
            name: name.clone(),
            outcome,
        });
    }

    match &spec.body {
        None => {}
        Some(BodySpec::Exact(source)) => report.body = compare_body(source, &actual.body)?,
        Some(BodySpec::Predicate(p)) => {
            let outcome = settle_now(
                p.evaluate(body_subject(&actual.body)),
                Slot::Body,
                p.describe(),
                &mut pending,
            )?;
            if let FieldOutcome::Failed { expectation, reason } = outcome {
                report.body = BodyOutcome::Failed { expectation, reason };
            }
        }
    }

    for (name, expected) in spec.tls.fields() {
        let Some(expected) = expected else { continue };
        let actual_field = actual
            .tls
            .fields()
            .into_iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v);
        let outcome = match actual_field {
            Some(v) if v == expected => FieldOutcome::Ok,
            Some(v) => differs(
                String::from_utf8_lossy(expected),
                String::from_utf8_lossy(v),
            ),
            None => FieldOutcome::Missing {
                expected: String::from_utf8_lossy(expected).into_owned(),
            },
        };
        report.tls.push((name, outcome));
    }

    if let Some(expected) = spec.reject_unauthorized {
        let actual_flag = actual.reject_unauthorized.unwrap_or(true);
        if expected != actual_flag {
            report.reject_unauthorized = differs(expected, actual_flag);
        }
    }

    if let Some(p) = &spec.predicate {
        report.predicate = settle_now(
            p.evaluate(Subject::Request(Box::new(actual.clone()))),
            Slot::Request,
            p.describe(),
            &mut pending,
        )?;
    }

    settle_pending(pending, &mut report).await;
    Ok(report)
}

fn differs(expected: impl ToString, actual: impl ToString) -> FieldOutcome {
    FieldOutcome::Differs {
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

fn settle_now(
    evaluation: Evaluation,
    slot: Slot,
    expectation: String,
    pending: &mut Vec<Pending>,
) -> Result<FieldOutcome> {
    match evaluation {
        Evaluation::Ready(Ok(())) => Ok(FieldOutcome::Ok),
        Evaluation::Ready(Err(reason)) => Ok(FieldOutcome::Failed { expectation, reason }),
        Evaluation::Suspended(verdict) => {
            pending.push(Pending {
                slot,
                expectation,
                verdict,
            });
            Ok(FieldOutcome::Ok)
        }
        Evaluation::Invalid(reason) => Err(Error::predicate(reason)),
    }
}

async fn settle_pending(pending: Vec<Pending>, report: &mut MismatchReport) {
    if pending.is_empty() {
        return;
    }

    let (targets, futures): (Vec<_>, Vec<_>) = pending
        .into_iter()
        .map(|p| ((p.slot, p.expectation), p.verdict))
        .unzip();

    for ((slot, expectation), verdict) in targets.into_iter().zip(join_all(futures).await) {
        let Err(reason) = verdict else { continue };
        match slot {
            Slot::Header(index) => {
                if let Some(header) = report.headers.get_mut(index) {
                    header.outcome = FieldOutcome::Failed { expectation, reason };
                }
            }
            Slot::Body => report.body = BodyOutcome::Failed { expectation, reason },
            Slot::Request => report.predicate = FieldOutcome::Failed { expectation, reason },
        }
    }
}

fn body_subject(body: &Body) -> Subject {
    match body.kind() {
        BodyKind::None => Subject::Text(String::new()),
        BodyKind::Json => match body.json_value() {
            Some(value) => Subject::Json(value),
            None => Subject::Text(String::from_utf8_lossy(body.as_bytes()).into_owned()),
        },
        BodyKind::Text => Subject::Text(String::from_utf8_lossy(body.as_bytes()).into_owned()),
        BodyKind::Binary => Subject::Bytes(body.as_bytes().clone()),
    }
}

/// Compare an observed body with an expected one
///
/// JSON is compared structurally whenever the expectation is a structured
/// value, or when the observed body is JSON and the expectation parses as
/// JSON; everything else is compared byte for byte.
fn compare_body(source: &BodySource, actual: &Body) -> Result<BodyOutcome> {
    let expected = canonicalize_expected(source)?;

    let expected_json = match source {
        BodySource::Json(value) => Some(value.clone()),
        BodySource::Text(_) | BodySource::Bytes(_) if actual.kind() == BodyKind::Json => {
            serde_json::from_slice::<Value>(expected.as_bytes()).ok()
        }
        _ => None,
    };

    if let Some(expected_json) = expected_json {
        let actual_json = serde_json::from_slice::<Value>(actual.as_bytes()).ok();
        return Ok(match actual_json {
            Some(actual_json) => match diff_json(&actual_json, &expected_json) {
                None => BodyOutcome::Ok,
                Some(lines) => BodyOutcome::Json(lines),
            },
            None => BodyOutcome::Differs {
                expected: pretty_json(&expected_json),
            },
        });
    }

    if expected.as_bytes() == actual.as_bytes() {
        Ok(BodyOutcome::Ok)
    } else {
        Ok(BodyOutcome::Differs {
            expected: render_body(&expected, None),
        })
    }
}

/// Compare what a mock delivered with what the live service answered
///
/// `ignore` lists header names (case-insensitive) left out of the comparison.
pub fn compare_response(
    mock: &ResponseDescriptor,
    live: &ResponseDescriptor,
    ignore: &[String],
) -> ResponseReport {
    let mut report = ResponseReport {
        mock: mock.clone(),
        live: live.clone(),
        status: FieldOutcome::Ok,
        headers: Vec::new(),
        body: BodyOutcome::Ok,
        error: FieldOutcome::Ok,
    };

    match (mock, live) {
        (ResponseDescriptor::Message(m), ResponseDescriptor::Message(l)) => {
            compare_messages(m, l, ignore, &mut report)
        }
        (ResponseDescriptor::Error(m), ResponseDescriptor::Error(l)) => {
            if error_key(m) != error_key(l) {
                report.error = differs(error_key(l), error_key(m));
            }
        }
        (ResponseDescriptor::Message(m), ResponseDescriptor::Error(l)) => {
            report.error = FieldOutcome::Failed {
                expectation: m.status_line(),
                reason: format!("the service failed with {}", l),
            };
        }
        (ResponseDescriptor::Error(m), ResponseDescriptor::Message(l)) => {
            report.error = FieldOutcome::Failed {
                expectation: m.to_string(),
                reason: format!("the service answered {}", l.status_line()),
            };
        }
    }

    report
}

fn error_key(err: &TransportError) -> String {
    err.code().map(String::from).unwrap_or_else(|| err.message.clone())
}

fn compare_messages(mock: &ResponseMessage, live: &ResponseMessage, ignore: &[String], report: &mut ResponseReport) {
    if mock.status != live.status {
        report.status = differs(live.status_line(), mock.status_line());
    }

    let ignored = |name: &str| ignore.iter().any(|i| i.eq_ignore_ascii_case(name));
    let mut seen: Vec<String> = Vec::new();

    for (name, _) in mock.headers.iter() {
        if ignored(name) || seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            continue;
        }
        seen.push(name.to_string());
        let mock_value = mock.headers.get_all(name).join(", ");
        let live_values = live.headers.get_all(name);
        let outcome = if live_values.is_empty() {
            FieldOutcome::Extra
        } else if live_values.join(", ") != mock_value {
            differs(live_values.join(", "), mock_value)
        } else {
            FieldOutcome::Ok
        };
        report.headers.push(HeaderOutcome {
            name: name.to_string(),
            outcome,
        });
    }

    for (name, _) in live.headers.iter() {
        if ignored(name) || seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            continue;
        }
        seen.push(name.to_string());
        report.headers.push(HeaderOutcome {
            name: name.to_string(),
            outcome: FieldOutcome::Missing {
                expected: live.headers.get_all(name).join(", "),
            },
        });
    }

    report.body = match (mock.body.json_value(), live.body.json_value()) {
        (Some(m), Some(l)) => match diff_json(&m, &l) {
            None => BodyOutcome::Ok,
            Some(lines) => BodyOutcome::Json(lines),
        },
        _ if mock.body.as_bytes() == live.body.as_bytes() => BodyOutcome::Ok,
        _ => BodyOutcome::Differs {
            expected: render_body(&live.body, live.headers.content_type()),
        },
    };
}
