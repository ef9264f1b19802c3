// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Interception sessions
//!
//! A session is the unit of work for one check. It holds the interception
//! registry while the code under test runs, answers (or forwards) every
//! request that code issues, and resolves to one result:
//!
//! 1. the first failure recorded during the run (mismatch, unexpected
//!    request, failed synthesizer, escaped panic, fatal predicate error);
//! 2. otherwise the code under test's own error, decorated with the traffic;
//! 3. otherwise any expectations left unconsumed;
//! 4. otherwise the code under test's value.
//!
//! # Example
//!
//! ```rust,no_run
//! use verkko::{HttpClient, Session};
//!
//! # async fn example() -> verkko::Result<()> {
//! let client = HttpClient::new()?;
//! let status = Session::mocked([("GET http://api.test/", 200u16)])
//!     .run(async {
//!         let response = client.get("http://api.test/").await?;
//!         Ok::<_, verkko::Error>(response.status_code())
//!     })
//!     .await?;
//! assert_eq!(status, 200);
//! # Ok(())
//! # }
//! ```

mod engine;
mod synth;

use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, Location};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::{self, FutureExt};

use self::engine::{panic_sink, Failure, SessionCore};
use crate::config::{Mode, SessionConfig};
use crate::diff::{render_traffic, TrafficItem};
use crate::error::{Error, Result};
use crate::fixture;
use crate::model::{ExchangeOutcome, ExpectationEntry, InterceptedExchange, PreparedEntry};
use crate::network::{trap, InterceptionRegistry};
use crate::queue::ExpectationQueue;
use crate::recorder::Recorder;
use crate::verifier;

pub use synth::{synthesize, ResponseSynthesizer, SynthRequest, SynthResponse};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Active,
    Draining,
    Closed,
}

/// Where the expectations come from
#[derive(Debug)]
enum Source {
    Entries(Vec<ExpectationEntry>),
    Json(String),
    File(PathBuf),
    Record,
    RecordAndInject(CallSite),
}

#[derive(Debug, Clone)]
struct CallSite {
    file: PathBuf,
    line: u32,
}

/// Metadata about a finished run
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// What the session did with traffic
    pub mode: Mode,
    /// When diversion was installed
    pub started_at: DateTime<Utc>,
    /// How long the code under test ran
    pub elapsed: Duration,
    /// Number of declared expectations
    pub declared: usize,
    /// Number of expectations consumed
    pub consumed: usize,
    /// Fixture file backing the session, if any
    pub fixture: Option<PathBuf>,
}

/// One check's interception session
#[derive(Debug)]
pub struct Session {
    source: Source,
    verify: bool,
    config: SessionConfig,
}

impl Session {
    fn with_source(source: Source) -> Self {
        Self {
            source,
            verify: false,
            config: SessionConfig::from_env(),
        }
    }

    /// Answer requests from the given expectations, in issuance order
    ///
    /// The entries are copied here; changing the originals afterwards has no
    /// effect on the session.
    pub fn mocked<I, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<ExpectationEntry>,
    {
        Self::with_source(Source::Entries(entries.into_iter().map(Into::into).collect()))
    }

    /// Answer requests from expectations written in the fixture JSON format
    ///
    /// Malformed JSON is reported when the session runs.
    pub fn mocked_from_json(json: &str) -> Self {
        Self::with_source(Source::Json(json.to_string()))
    }

    /// Replay a fixture file, or capture one if it does not exist yet
    ///
    /// With writing forced (`VERKKO_WRITE`) the file is always re-captured.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::with_source(Source::File(path.into()))
    }

    /// Forward every request to the real network and keep the exchanges
    pub fn recorded() -> Self {
        Self::with_source(Source::Record)
    }

    /// Like [`Session::recorded`], then rewrite this call in the caller's
    /// source file into a `mocked_from_json` call holding the recording
    #[track_caller]
    pub fn recorded_and_injected() -> Self {
        let location = Location::caller();
        Self::with_source(Source::RecordAndInject(CallSite {
            file: PathBuf::from(location.file()),
            line: location.line(),
        }))
    }

    /// After a successful mocked run, check every answered request against
    /// the live service
    pub fn verified(mut self) -> Self {
        self.verify = true;
        self
    }

    /// Replace the configuration read from the environment
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the code under test
    pub async fn run<F, T, E>(self, delegate: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        self.run_with_extra_info(delegate)
            .await
            .map(|(value, _, _)| value)
    }

    /// Run the code under test, also returning the traffic and run metadata
    pub async fn run_with_extra_info<F, T, E>(
        self,
        delegate: F,
    ) -> Result<(T, Vec<InterceptedExchange>, SessionContext)>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        let Session {
            source,
            verify,
            config,
        } = self;
        let verify = verify || config.force_verify;

        let (mode, entries, fixture_path) = match &source {
            Source::Entries(entries) => (mocked_mode(verify), entries.clone(), None),
            Source::Json(json) => (mocked_mode(verify), fixture::parse(json)?, None),
            Source::File(path) => {
                if config.force_write || !path.exists() {
                    (Mode::Capture, Vec::new(), Some(path.clone()))
                } else {
                    let entries = fixture::read(path)?;
                    let mode = if verify { Mode::Verify } else { Mode::Replay };
                    (mode, entries, Some(path.clone()))
                }
            }
            Source::Record | Source::RecordAndInject(_) => (Mode::Record, Vec::new(), None),
        };

        let queue = ExpectationQueue::prepare(&entries).await;
        let recorder = if mode.forwards() || mode == Mode::Verify {
            Some(Recorder::new(&config)?)
        } else {
            None
        };
        let core = Arc::new(SessionCore::new(mode, queue, recorder.clone()));

        let mut state = SessionState::Idle;
        trap::install();
        let guard = InterceptionRegistry::global()
            .acquire(core.clone(), Some(panic_sink(&core)))
            .await;
        transition(&mut state, SessionState::Active, mode);

        // Panics unwinding out of the delegate are caught below; the trap only
        // reports the ones raised on other tasks and threads.
        let delegate = AssertUnwindSafe(delegate).catch_unwind();
        tokio::pin!(delegate);
        let delegate = future::poll_fn(|cx| trap::suppressed(|| delegate.as_mut().poll(cx)));

        let started_at = Utc::now();
        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = core.failed() => None,
            result = delegate => Some(result),
        };
        let elapsed = started.elapsed();

        transition(&mut state, SessionState::Draining, mode);
        drop(guard);
        transition(&mut state, SessionState::Closed, mode);

        let value = resolve(&core, mode, outcome)?;

        let recorded = core.log().recorded();
        match (&source, mode) {
            (Source::File(path), Mode::Capture) => fixture::write(path, &recorded)?,
            (Source::RecordAndInject(site), _) => fixture::inject(&site.file, site.line, &recorded)?,
            (_, Mode::Verify) => {
                if let Some(recorder) = &recorder {
                    verifier::verify(
                        recorder,
                        &core.log().matched(),
                        core.queue(),
                        &config.volatile_headers,
                    )
                    .await?;
                }
            }
            _ => {}
        }

        let context = SessionContext {
            mode,
            started_at,
            elapsed,
            declared: core.queue().len(),
            consumed: core.queue().consumed(),
            fixture: fixture_path,
        };
        Ok((value, core.log().exchanges(), context))
    }
}

fn mocked_mode(verify: bool) -> Mode {
    if verify {
        Mode::Verify
    } else {
        Mode::Mock
    }
}

fn transition(state: &mut SessionState, next: SessionState, mode: Mode) {
    tracing::debug!(from = ?*state, to = ?next, %mode, "Session state transition");
    *state = next;
}

/// Apply resolution precedence to a finished run
fn resolve<T, E: fmt::Display>(
    core: &SessionCore,
    mode: Mode,
    outcome: Option<std::thread::Result<std::result::Result<T, E>>>,
) -> Result<T> {
    if let Some(failure) = core.take_failure() {
        return Err(match failure {
            Failure::Mismatch { sequence } => Error::RequestMismatch {
                report: render_log(core, Some(sequence), false),
            },
            Failure::Unexpected { sequence } => Error::UnexpectedTraffic {
                report: render_log(core, Some(sequence), false),
            },
            Failure::Synthesizer(reason) => Error::Synthesizer(reason),
            Failure::Escaped(message) => Error::Escaped {
                message,
                traffic: traffic_suffix(core),
            },
            Failure::Fatal(err) => err,
        });
    }

    match outcome {
        None => Err(Error::other("session interrupted without a recorded failure")),
        Some(Err(payload)) => Err(Error::Escaped {
            message: trap::panic_message(payload.as_ref()),
            traffic: traffic_suffix(core),
        }),
        Some(Ok(Err(err))) => Err(Error::Delegate {
            message: err.to_string(),
            traffic: traffic_suffix(core),
        }),
        Some(Ok(Ok(value))) => {
            let missing = if mode.mocks() {
                core.queue().unconsumed().len()
            } else {
                0
            };
            if missing > 0 {
                tracing::warn!(missing, "Expected traffic was not issued");
                return Err(Error::MissingTraffic {
                    report: render_log(core, None, true),
                    missing,
                });
            }
            Ok(value)
        }
    }
}

fn traffic_suffix(core: &SessionCore) -> String {
    let traffic = render_log(core, None, false);
    if traffic.is_empty() {
        String::new()
    } else {
        format!("\n\n{}", traffic)
    }
}

/// Render the session's traffic, optionally up to a sequence number and with
/// the unconsumed entries appended as missing
fn render_log(core: &SessionCore, upto: Option<u64>, with_missing: bool) -> String {
    let exchanges = core.log().exchanges();
    let entries: Vec<Option<PreparedEntry>> = exchanges
        .iter()
        .map(|e| e.entry().and_then(|index| core.queue().entry(index)))
        .collect();
    let unconsumed = if with_missing {
        core.queue().unconsumed()
    } else {
        Vec::new()
    };

    let mut items = Vec::new();
    for (exchange, entry) in exchanges.iter().zip(&entries) {
        if upto.map_or(false, |sequence| exchange.sequence > sequence) {
            continue;
        }
        match &exchange.outcome {
            ExchangeOutcome::Aborted => {}
            ExchangeOutcome::Mismatched { report, .. } => items.push(TrafficItem::Mismatch {
                report: report.as_ref(),
                response: entry.as_ref().map(|e| &e.response),
            }),
            ExchangeOutcome::Unexpected => items.push(TrafficItem::Unexpected {
                request: &exchange.request,
            }),
            ExchangeOutcome::Matched { .. } | ExchangeOutcome::Forwarded => {
                items.push(TrafficItem::Exchange {
                    request: &exchange.request,
                    response: &exchange.response,
                })
            }
        }
    }
    items.extend(unconsumed.iter().map(|entry| TrafficItem::Missing { entry }));

    render_traffic(&items)
}
