// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Descriptor model
//!
//! Canonical, comparable forms of requests, responses and the expectation
//! entries pairing them.

mod entry;
mod exchange;
mod headers;
mod request;
mod response;

pub use entry::{
    ExpectationEntry, PreparedEntry, PreparedResponse, RecordedEntry, ResponseSpec, VerifyOptions,
};
pub use exchange::{ExchangeOutcome, InterceptedExchange};
pub use headers::{canonical_name, Headers};
pub use request::{RequestDescriptor, Scheme, TlsMaterial};
pub use response::{status_line, ResponseDescriptor, ResponseMessage, TransportError};
