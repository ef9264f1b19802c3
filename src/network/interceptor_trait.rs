// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request interceptor trait
//!
//! The seam between diverted traffic and whatever answers it. The diverted
//! client calls `admit` synchronously when a request is issued, then awaits
//! `intercept` with the ticket it was given.

use async_trait::async_trait;

use crate::model::{RequestDescriptor, ResponseMessage, TransportError};

/// Receiver of diverted requests
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use async_trait::async_trait;
/// use verkko::model::{RequestDescriptor, ResponseMessage};
/// use verkko::network::{InterceptAction, RequestInterceptor};
///
/// struct AlwaysOk {
///     issued: AtomicU64,
/// }
///
/// #[async_trait]
/// impl RequestInterceptor for AlwaysOk {
///     fn admit(&self) -> u64 {
///         self.issued.fetch_add(1, Ordering::SeqCst)
///     }
///
///     async fn intercept(&self, _ticket: u64, _request: RequestDescriptor) -> InterceptAction {
///         InterceptAction::Respond(ResponseMessage::new(200))
///     }
/// }
/// ```
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Hand out the next issuance ticket
    ///
    /// Called before any suspension point of the request, so tickets follow
    /// the order in which requests were issued.
    fn admit(&self) -> u64;

    /// Decide what the request receives
    async fn intercept(&self, ticket: u64, request: RequestDescriptor) -> InterceptAction;
}

/// What a diverted request receives
#[derive(Debug, Clone)]
pub enum InterceptAction {
    /// Deliver this response
    Respond(ResponseMessage),
    /// Fail the request as though the transport broke
    Abort(TransportError),
}

impl InterceptAction {
    /// Check if the request is aborted
    pub fn is_abort(&self) -> bool {
        matches!(self, InterceptAction::Abort(_))
    }
}
