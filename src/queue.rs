// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Expectation queue
//!
//! Owns the session's snapshot of the declared entries and pairs requests
//! with them by issuance order: the request holding ticket N is matched
//! against entry N, no matter which request finishes first.

use parking_lot::Mutex;

use crate::body::canonicalize;
use crate::error::Result;
use crate::matcher::{match_request, MismatchReport};
use crate::model::{
    ExpectationEntry, PreparedEntry, PreparedResponse, RequestDescriptor, ResponseMessage,
    ResponseSpec,
};

/// Result of offering a request to the queue
#[derive(Debug)]
pub enum Take {
    /// The paired entry matched and is now consumed
    Matched(PreparedEntry),
    /// The paired entry did not match; it stays unconsumed
    Mismatched {
        entry: PreparedEntry,
        report: MismatchReport,
    },
    /// Every declared entry was already paired
    Unexpected,
}

struct Slot {
    entry: PreparedEntry,
    consumed: bool,
}

/// Ordered, consume-once list of expectation entries
pub struct ExpectationQueue {
    slots: Mutex<Vec<Slot>>,
}

impl ExpectationQueue {
    /// Build a queue from already prepared entries
    pub fn new(entries: Vec<PreparedEntry>) -> Self {
        Self {
            slots: Mutex::new(
                entries
                    .into_iter()
                    .map(|entry| Slot {
                        entry,
                        consumed: false,
                    })
                    .collect(),
            ),
        }
    }

    /// Snapshot caller entries, draining response streams
    pub async fn prepare(entries: &[ExpectationEntry]) -> Self {
        let mut prepared = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            prepared.push(PreparedEntry {
                index,
                request: entry.request.clone(),
                response: prepare_response(&entry.response).await,
                verify: entry.verify.clone(),
            });
        }
        Self::new(prepared)
    }

    /// Number of declared entries
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Check if no entries were declared
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Entry at a position
    pub fn entry(&self, index: usize) -> Option<PreparedEntry> {
        self.slots.lock().get(index).map(|s| s.entry.clone())
    }

    /// Match the request holding `ticket` against its paired entry
    ///
    /// Fails only for fatal conditions (unusable predicate, non-replayable
    /// expected body).
    pub async fn take(&self, ticket: u64, actual: &RequestDescriptor) -> Result<Take> {
        let entry = {
            let slots = self.slots.lock();
            match usize::try_from(ticket).ok().and_then(|i| slots.get(i)) {
                Some(slot) => slot.entry.clone(),
                None => return Ok(Take::Unexpected),
            }
        };

        let report = match &entry.request {
            None => None,
            Some(spec) => Some(match_request(spec, actual).await?),
        };

        match report {
            Some(report) if !report.is_match() => Ok(Take::Mismatched { entry, report }),
            _ => {
                if let Some(slot) = self.slots.lock().get_mut(entry.index) {
                    slot.consumed = true;
                }
                Ok(Take::Matched(entry))
            }
        }
    }

    /// Entries never consumed, in declaration order
    pub fn unconsumed(&self) -> Vec<PreparedEntry> {
        self.slots
            .lock()
            .iter()
            .filter(|s| !s.consumed)
            .map(|s| s.entry.clone())
            .collect()
    }

    /// Number of consumed entries
    pub fn consumed(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.consumed).count()
    }
}

async fn prepare_response(spec: &ResponseSpec) -> PreparedResponse {
    match spec {
        ResponseSpec::Status(status) => PreparedResponse::Message(ResponseMessage::new(*status)),
        ResponseSpec::Message {
            status,
            headers,
            body,
        } => {
            let mut headers = headers.clone();
            let canonical = canonicalize(body, &mut headers).await;
            match canonical.error {
                Some(err) => {
                    tracing::debug!(error = %err, "Response body stream failed, delivering as transport error");
                    PreparedResponse::Error(err)
                }
                None => PreparedResponse::Message(ResponseMessage {
                    status: *status,
                    headers,
                    body: canonical.body,
                }),
            }
        }
        ResponseSpec::Error(err) => PreparedResponse::Error(err.clone()),
        ResponseSpec::Synthesized(synth) => PreparedResponse::Synthesized(synth.clone()),
    }
}
