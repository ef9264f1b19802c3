// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Live verification of mocked exchanges
//!
//! Re-issues each answered request against the real service and compares
//! what the mock delivered with what the service says now.

use crate::diff::{render_request, render_response_report};
use crate::error::{Error, Result};
use crate::matcher::{compare_response, ResponseReport};
use crate::model::{InterceptedExchange, PreparedResponse, RequestDescriptor, ResponseDescriptor};
use crate::queue::ExpectationQueue;
use crate::recorder::Recorder;

/// One exchange the live service disagreed with
#[derive(Debug, Clone)]
pub struct Divergence {
    pub request: RequestDescriptor,
    pub report: ResponseReport,
}

/// Compare exchanges with the live service, collecting every divergence
///
/// `volatile` headers are left out of every comparison, on top of each
/// entry's own ignored headers.
pub async fn check(
    recorder: &Recorder,
    exchanges: &[InterceptedExchange],
    queue: &ExpectationQueue,
    volatile: &[String],
) -> Vec<Divergence> {
    let mut divergences = Vec::new();

    for exchange in exchanges {
        let mut ignore = volatile.to_vec();
        if let Some(entry) = exchange.entry().and_then(|index| queue.entry(index)) {
            ignore.extend(entry.verify.ignore_headers.iter().cloned());
        }

        let live = recorder.forward(&exchange.request).await;
        let report = compare_response(&exchange.response, &live, &ignore);
        if report.is_match() {
            tracing::debug!(request = %exchange.request.request_line(), "Mock agrees with the service");
        } else {
            tracing::warn!(request = %exchange.request.request_line(), "Mock and service have diverged");
            divergences.push(Divergence {
                request: exchange.request.clone(),
                report,
            });
        }
    }

    divergences
}

/// Replay every entry of a prepared fixture against the live service
///
/// Entries that cannot be turned into a concrete request (no host, or only
/// predicates) and synthesized responses are skipped.
pub async fn check_entries(
    recorder: &Recorder,
    queue: &ExpectationQueue,
    volatile: &[String],
) -> Vec<Divergence> {
    let mut divergences = Vec::new();

    for index in 0..queue.len() {
        let Some(entry) = queue.entry(index) else { continue };
        let expected = match &entry.response {
            PreparedResponse::Message(message) => ResponseDescriptor::Message(message.clone()),
            PreparedResponse::Error(err) => ResponseDescriptor::Error(err.clone()),
            PreparedResponse::Synthesized(_) => {
                tracing::debug!(entry = index, "Skipping synthesized response");
                continue;
            }
        };
        let request = match entry.request.as_ref().map(|spec| spec.to_descriptor()) {
            Some(Ok(request)) => request,
            Some(Err(e)) => {
                tracing::warn!(entry = index, error = %e, "Entry cannot be replayed");
                continue;
            }
            None => {
                tracing::warn!(entry = index, "Entry matches any request, nothing to replay");
                continue;
            }
        };

        let mut ignore = volatile.to_vec();
        ignore.extend(entry.verify.ignore_headers.iter().cloned());

        let live = recorder.forward(&request).await;
        let report = compare_response(&expected, &live, &ignore);
        if !report.is_match() {
            tracing::warn!(request = %request.request_line(), "Fixture and service have diverged");
            divergences.push(Divergence { request, report });
        }
    }

    divergences
}

/// Fail with `Divergence` if the service disagrees with any exchange
pub async fn verify(
    recorder: &Recorder,
    exchanges: &[InterceptedExchange],
    queue: &ExpectationQueue,
    volatile: &[String],
) -> Result<()> {
    let divergences = check(recorder, exchanges, queue, volatile).await;
    if divergences.is_empty() {
        return Ok(());
    }
    Err(Error::Divergence {
        report: render_divergences(&divergences),
    })
}

/// Render divergences as request blocks followed by the annotated response
pub fn render_divergences(divergences: &[Divergence]) -> String {
    divergences
        .iter()
        .map(|d| {
            let mut lines = render_request(&d.request);
            lines.push(String::new());
            lines.extend(render_response_report(&d.report));
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::model::{
        ExchangeOutcome, ExpectationEntry, Headers, ResponseMessage, ResponseSpec,
    };
    use chrono::Utc;
    use std::time::Duration;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn exchange(url: &str, response: ResponseMessage) -> InterceptedExchange {
        InterceptedExchange {
            sequence: 0,
            timestamp: Utc::now(),
            duration: Duration::ZERO,
            request: RequestDescriptor::new("GET", url).unwrap(),
            response: response.into(),
            outcome: ExchangeOutcome::Matched { entry: 0 },
        }
    }

    #[tokio::test]
    async fn test_divergence_detected_and_ignored_headers_skipped() {
        let server = MockServer::start().await;
        Mock::given(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-request-id", "live")
                    .set_body_raw("live", "text/plain"),
            )
            .mount(&server)
            .await;

        let recorder = Recorder::new(&SessionConfig::new()).unwrap();
        let mock = ResponseMessage {
            status: 200,
            headers: Headers::new()
                .with("X-Request-Id", "mocked")
                .with("Content-Type", "text/plain"),
            body: crate::body::Body::text("live"),
        };
        let exchanges = vec![exchange(&format!("{}/", server.uri()), mock)];

        let plain = ExpectationQueue::prepare(&[ExpectationEntry::new(ResponseSpec::status(200))]).await;
        let divergences = check(&recorder, &exchanges, &plain, &[]).await;
        assert_eq!(divergences.len(), 1);
        assert!(!divergences[0].report.header("x-request-id").unwrap().is_ok());

        let ignoring = ExpectationQueue::prepare(&[
            ExpectationEntry::new(ResponseSpec::status(200)).ignore_header("X-REQUEST-ID"),
        ])
        .await;
        let volatile: Vec<String> = crate::config::VOLATILE_HEADERS
            .iter()
            .map(|h| h.to_string())
            .collect();
        assert!(verify(&recorder, &exchanges, &ignoring, &volatile).await.is_ok());
    }

    #[tokio::test]
    async fn test_check_entries_replays_fixture() {
        let server = MockServer::start().await;
        Mock::given(path("/status"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let recorder = Recorder::new(&SessionConfig::new()).unwrap();
        let entries = vec![
            ExpectationEntry::new(ResponseSpec::Status(200))
                .request(format!("GET {}/status", server.uri())),
            ExpectationEntry::new(ResponseSpec::Status(200)),
        ];
        let queue = ExpectationQueue::prepare(&entries).await;

        let divergences = check_entries(&recorder, &queue, &[]).await;
        assert_eq!(divergences.len(), 1);
        assert_eq!(divergences[0].request.path, "/status");
        assert!(!divergences[0].report.status.is_ok());
    }
}
