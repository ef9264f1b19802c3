// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Per-session interceptor
//!
//! Pairs every diverted request with its expectation (or forwards it), logs
//! the exchange and keeps the session's first failure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::synth;
use crate::body::normalize_framing;
use crate::config::Mode;
use crate::error::Error;
use crate::model::{
    ExchangeOutcome, InterceptedExchange, PreparedEntry, PreparedResponse, RequestDescriptor,
    ResponseDescriptor, TransportError,
};
use crate::network::{ExchangeLog, InterceptAction, RequestInterceptor};
use crate::queue::{ExpectationQueue, Take};
use crate::recorder::Recorder;

/// Why a session failed, recorded when it happens and rendered at resolution
#[derive(Debug)]
pub(crate) enum Failure {
    /// The request with this ticket failed its entry
    Mismatch { sequence: u64 },
    /// The request with this ticket had no entry left
    Unexpected { sequence: u64 },
    /// A synthesizer returned an error or panicked
    Synthesizer(String),
    /// A panic escaped the code under test
    Escaped(String),
    /// A fatal error (invalid predicate, non-replayable body)
    Fatal(Error),
}

pub(crate) struct SessionCore {
    mode: Mode,
    queue: ExpectationQueue,
    recorder: Option<Recorder>,
    issued: AtomicU64,
    log: ExchangeLog,
    failure: Mutex<Option<Failure>>,
    failed: Notify,
}

impl SessionCore {
    pub(crate) fn new(mode: Mode, queue: ExpectationQueue, recorder: Option<Recorder>) -> Self {
        Self {
            mode,
            queue,
            recorder,
            issued: AtomicU64::new(0),
            log: ExchangeLog::new(),
            failure: Mutex::new(None),
            failed: Notify::new(),
        }
    }

    pub(crate) fn queue(&self) -> &ExpectationQueue {
        &self.queue
    }

    pub(crate) fn log(&self) -> &ExchangeLog {
        &self.log
    }

    /// Keep the first failure and wake the session
    pub(crate) fn fail(&self, failure: Failure) {
        let mut slot = self.failure.lock();
        if slot.is_none() {
            tracing::debug!(?failure, "Session failed");
            *slot = Some(failure);
            drop(slot);
            self.failed.notify_one();
        }
    }

    pub(crate) fn has_failed(&self) -> bool {
        self.failure.lock().is_some()
    }

    pub(crate) fn take_failure(&self) -> Option<Failure> {
        self.failure.lock().take()
    }

    /// Resolves once a failure is recorded
    pub(crate) async fn failed(&self) {
        if self.has_failed() {
            return;
        }
        self.failed.notified().await;
    }

    fn record(
        &self,
        sequence: u64,
        started: Instant,
        request: RequestDescriptor,
        response: ResponseDescriptor,
        outcome: ExchangeOutcome,
    ) {
        self.log.push(InterceptedExchange {
            sequence,
            timestamp: Utc::now(),
            duration: started.elapsed(),
            request,
            response,
            outcome,
        });
    }

    async fn forward(&self, ticket: u64, started: Instant, request: RequestDescriptor) -> InterceptAction {
        let response = match &self.recorder {
            Some(recorder) => recorder.forward(&request).await,
            None => ResponseDescriptor::Error(TransportError::new("no upstream recorder configured")),
        };
        let action = match &response {
            ResponseDescriptor::Message(message) => InterceptAction::Respond(message.clone()),
            ResponseDescriptor::Error(err) => InterceptAction::Abort(err.clone()),
        };
        self.record(ticket, started, request, response, ExchangeOutcome::Forwarded);
        action
    }

    async fn mock(&self, ticket: u64, started: Instant, request: RequestDescriptor) -> InterceptAction {
        let take = match self.queue.take(ticket, &request).await {
            Ok(take) => take,
            Err(err) => {
                tracing::warn!(error = %err, request = %request.request_line(), "Expectation could not be evaluated");
                self.fail(Failure::Fatal(err));
                return self.abort(ticket, started, request, ExchangeOutcome::Aborted);
            }
        };

        match take {
            Take::Matched(entry) => {
                tracing::debug!(ticket, entry = entry.index, "Request matched");
                let response = self.deliver(&entry, &request);
                let action = match &response {
                    ResponseDescriptor::Message(message) => InterceptAction::Respond(message.clone()),
                    ResponseDescriptor::Error(err) => InterceptAction::Abort(err.clone()),
                };
                self.record(
                    ticket,
                    started,
                    request,
                    response,
                    ExchangeOutcome::Matched { entry: entry.index },
                );
                action
            }
            Take::Mismatched { entry, report } => {
                tracing::warn!(
                    ticket,
                    entry = entry.index,
                    fields = ?report.differing_fields(),
                    "Request did not match its expectation"
                );
                self.fail(Failure::Mismatch { sequence: ticket });
                self.abort(
                    ticket,
                    started,
                    request,
                    ExchangeOutcome::Mismatched {
                        entry: entry.index,
                        report: Box::new(report),
                    },
                )
            }
            Take::Unexpected => {
                tracing::warn!(
                    ticket,
                    declared = self.queue.len(),
                    request = %request.request_line(),
                    "Unexpected request"
                );
                self.fail(Failure::Unexpected { sequence: ticket });
                self.abort(ticket, started, request, ExchangeOutcome::Unexpected)
            }
        }
    }

    /// Response for a matched entry, framing corrected
    fn deliver(&self, entry: &PreparedEntry, request: &RequestDescriptor) -> ResponseDescriptor {
        match &entry.response {
            PreparedResponse::Message(message) => {
                let mut message = message.clone();
                normalize_framing(&mut message.headers, message.body.len());
                ResponseDescriptor::Message(message)
            }
            PreparedResponse::Error(err) => ResponseDescriptor::Error(err.clone()),
            PreparedResponse::Synthesized(synthesizer) => {
                match synth::run(synthesizer.as_ref(), request) {
                    Ok(message) => ResponseDescriptor::Message(message),
                    Err(reason) => {
                        tracing::warn!(entry = entry.index, %reason, "Response synthesizer failed");
                        self.fail(Failure::Synthesizer(reason));
                        ResponseDescriptor::Error(TransportError::socket_hang_up())
                    }
                }
            }
        }
    }

    fn abort(
        &self,
        ticket: u64,
        started: Instant,
        request: RequestDescriptor,
        outcome: ExchangeOutcome,
    ) -> InterceptAction {
        let err = TransportError::socket_hang_up();
        self.record(
            ticket,
            started,
            request,
            ResponseDescriptor::Error(err.clone()),
            outcome,
        );
        InterceptAction::Abort(err)
    }
}

#[async_trait]
impl RequestInterceptor for SessionCore {
    fn admit(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst)
    }

    async fn intercept(&self, ticket: u64, request: RequestDescriptor) -> InterceptAction {
        let started = Instant::now();
        tracing::debug!(
            ticket,
            mode = %self.mode,
            request = %request.request_line(),
            host = %request.host_header(),
            "Intercepted request"
        );

        if self.has_failed() {
            tracing::debug!(ticket, "Session already failed, aborting request");
            return self.abort(ticket, started, request, ExchangeOutcome::Aborted);
        }

        if self.mode.forwards() {
            return self.forward(ticket, started, request).await;
        }

        match request.timeout {
            Some(limit) => {
                let pending = request.clone();
                match tokio::time::timeout(limit, self.mock(ticket, started, request)).await {
                    Ok(action) => action,
                    Err(_) => {
                        tracing::debug!(ticket, ?limit, "Mocked request timed out");
                        let err = TransportError::timed_out(&pending.host, pending.port);
                        self.record(
                            ticket,
                            started,
                            pending,
                            ResponseDescriptor::Error(err.clone()),
                            ExchangeOutcome::Aborted,
                        );
                        InterceptAction::Abort(err)
                    }
                }
            }
            None => self.mock(ticket, started, request).await,
        }
    }
}

/// Weak handle the panic trap reports into
pub(crate) fn panic_sink(core: &Arc<SessionCore>) -> crate::network::trap::PanicSink {
    let weak = Arc::downgrade(core);
    Arc::new(move |message: String| {
        if let Some(core) = weak.upgrade() {
            core.fail(Failure::Escaped(message));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::matcher::{eventually, RequestSpec};
    use crate::model::ExpectationEntry;

    async fn core(entries: Vec<ExpectationEntry>) -> SessionCore {
        SessionCore::new(Mode::Mock, ExpectationQueue::prepare(&entries).await, None)
    }

    fn get(path: &str) -> RequestDescriptor {
        RequestDescriptor::new("GET", &format!("http://localhost{}", path)).unwrap()
    }

    #[tokio::test]
    async fn test_matched_request_responds() {
        let core = core(vec![ExpectationEntry::from(("GET /", 200u16))]).await;
        let ticket = core.admit();
        let action = core.intercept(ticket, get("/")).await;
        assert!(matches!(action, InterceptAction::Respond(ref m) if m.status == 200));
        assert!(!core.has_failed());
        assert_eq!(core.queue().consumed(), 1);
    }

    #[tokio::test]
    async fn test_mismatch_fails_fast() {
        let core = core(vec![
            ExpectationEntry::from(("GET /bar", 200u16)),
            ExpectationEntry::from(("GET /", 200u16)),
        ])
        .await;

        let first = core.admit();
        let second = core.admit();
        assert!(core.intercept(first, get("/foo")).await.is_abort());
        assert!(matches!(core.take_failure(), Some(Failure::Mismatch { sequence: 0 })));

        core.fail(Failure::Mismatch { sequence: 0 });
        assert!(core.intercept(second, get("/")).await.is_abort());
        let outcomes: Vec<_> = core.log().exchanges().into_iter().map(|e| e.outcome).collect();
        assert!(matches!(outcomes[1], ExchangeOutcome::Aborted));
    }

    #[tokio::test]
    async fn test_slow_expectation_times_out() {
        let slow = RequestSpec::parse("GET /").satisfies(eventually("to settle", |_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }));
        let core = core(vec![ExpectationEntry::new(200u16).request(slow)]).await;

        let ticket = core.admit();
        let request = RequestDescriptor {
            timeout: Some(Duration::from_millis(50)),
            ..get("/")
        };
        match core.intercept(ticket, request).await {
            InterceptAction::Abort(err) => assert_eq!(err.code(), Some("ETIMEDOUT")),
            other => panic!("unexpected action: {:?}", other),
        }
        assert!(!core.has_failed());
        assert_eq!(core.queue().consumed(), 0);
    }

    #[tokio::test]
    async fn test_first_failure_wins() {
        let core = core(Vec::new()).await;
        core.fail(Failure::Escaped("first".into()));
        core.fail(Failure::Synthesizer("second".into()));
        core.failed().await;
        assert!(matches!(core.take_failure(), Some(Failure::Escaped(m)) if m == "first"));
    }
}
