// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Exchange log for a session's observed traffic

use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::{ExchangeOutcome, InterceptedExchange, RecordedEntry};

/// Log of every exchange a session observed
///
/// Exchanges are appended as they settle and read back in issuance order.
#[derive(Clone, Default)]
pub struct ExchangeLog {
    exchanges: Arc<RwLock<Vec<InterceptedExchange>>>,
}

impl ExchangeLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a settled exchange
    pub fn push(&self, exchange: InterceptedExchange) {
        tracing::trace!(
            sequence = exchange.sequence,
            request = %exchange.request.request_line(),
            "Exchange settled"
        );
        self.exchanges.write().push(exchange);
    }

    /// All exchanges in issuance order
    pub fn exchanges(&self) -> Vec<InterceptedExchange> {
        let mut exchanges = self.exchanges.read().clone();
        exchanges.sort_by_key(|e| e.sequence);
        exchanges
    }

    /// Exchanges that failed their expectation
    pub fn failures(&self) -> Vec<InterceptedExchange> {
        self.exchanges()
            .into_iter()
            .filter(|e| e.is_failure())
            .collect()
    }

    /// Exchanges answered from a matching entry
    pub fn matched(&self) -> Vec<InterceptedExchange> {
        self.exchanges()
            .into_iter()
            .filter(|e| e.is_matched())
            .collect()
    }

    /// Forwarded exchanges as recordings, in issuance order
    pub fn recorded(&self) -> Vec<RecordedEntry> {
        self.exchanges()
            .iter()
            .filter(|e| matches!(e.outcome, ExchangeOutcome::Forwarded))
            .map(InterceptedExchange::to_recorded)
            .collect()
    }

    /// Number of exchanges
    pub fn len(&self) -> usize {
        self.exchanges.read().len()
    }

    /// Check if nothing was observed
    pub fn is_empty(&self) -> bool {
        self.exchanges.read().is_empty()
    }
}
