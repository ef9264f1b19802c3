// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Intercepted exchange records

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{RecordedEntry, RequestDescriptor, ResponseDescriptor};
use crate::matcher::MismatchReport;

/// How an intercepted request was handled
#[derive(Debug, Clone)]
pub enum ExchangeOutcome {
    /// Paired with the entry at this index and answered from it
    Matched { entry: usize },
    /// Failed the entry at this index
    Mismatched {
        entry: usize,
        report: Box<MismatchReport>,
    },
    /// No entry was left for this request
    Unexpected,
    /// Arrived after the session had already failed
    Aborted,
    /// Sent to the real network
    Forwarded,
}

/// One observed request with what it received
#[derive(Debug, Clone)]
pub struct InterceptedExchange {
    /// Issuance order, starting at zero
    pub sequence: u64,
    /// When the request was intercepted
    pub timestamp: DateTime<Utc>,
    /// Time until the response was delivered
    pub duration: Duration,
    /// The request
    pub request: RequestDescriptor,
    /// What the request received
    pub response: ResponseDescriptor,
    /// How it was handled
    pub outcome: ExchangeOutcome,
}

impl InterceptedExchange {
    /// Check if the exchange was answered from a matching entry
    pub fn is_matched(&self) -> bool {
        matches!(self.outcome, ExchangeOutcome::Matched { .. })
    }

    /// Check if the exchange failed its expectation
    pub fn is_failure(&self) -> bool {
        matches!(
            self.outcome,
            ExchangeOutcome::Mismatched { .. } | ExchangeOutcome::Unexpected
        )
    }

    /// Entry index this exchange was paired with
    pub fn entry(&self) -> Option<usize> {
        match self.outcome {
            ExchangeOutcome::Matched { entry } | ExchangeOutcome::Mismatched { entry, .. } => {
                Some(entry)
            }
            _ => None,
        }
    }

    /// The exchange as a recording
    pub fn to_recorded(&self) -> RecordedEntry {
        RecordedEntry {
            request: self.request.clone(),
            response: self.response.clone(),
        }
    }
}
