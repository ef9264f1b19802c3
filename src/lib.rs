// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Verkko - HTTP interception for test suites
//!
//! Runs code under test with its outbound HTTP traffic diverted, so that
//! every request is answered from declared expectations, forwarded to the
//! real service and recorded, or replayed from a fixture file.
//!
//! ## Features
//!
//! - Ordered expectations: the Nth request issued is matched against the Nth entry
//! - Precise diffs: mismatches are reported field by field, JSON bodies line by line
//! - Predicates: header and body expectations can be checks instead of values
//! - Recording: capture real exchanges into fixture files or back into the test source
//! - Live verification: re-issue mocked requests and compare with the real service
//! - Response synthesizers: build a response imperatively from the request
//!
//! ## Example
//!
//! ```rust,no_run
//! use verkko::{ExpectationEntry, HttpClient, RequestSpec, ResponseSpec, Session};
//!
//! #[tokio::main]
//! async fn main() -> verkko::Result<()> {
//!     let client = HttpClient::new()?;
//!
//!     let body = Session::mocked([ExpectationEntry::new(
//!         ResponseSpec::status(200)
//!             .header("Content-Type", "application/json")
//!             .body(serde_json::json!({"id": 1})),
//!     )
//!     .request(RequestSpec::parse("GET https://api.example.com/users/1"))])
//!     .run(async {
//!         let response = client.get("https://api.example.com/users/1").await?;
//!         response.text()
//!     })
//!     .await?;
//!
//!     println!("{}", body);
//!     Ok(())
//! }
//! ```

pub mod body;
pub mod config;
pub mod diff;
pub mod error;
pub mod fixture;
pub mod http;
pub mod matcher;
pub mod model;
pub mod network;
pub mod queue;
pub mod recorder;
pub mod session;
pub mod verifier;

// Re-exports for convenience

// Sessions
pub use session::{
    synthesize, ResponseSynthesizer, Session, SessionContext, SynthRequest, SynthResponse,
};

// Configuration
pub use config::{Mode, SessionConfig};

// Errors
pub use error::{Error, ErrorContext, Result};

// HTTP
pub use http::{HttpClient, HttpClientConfig, Request, RequestBuilder, Response};

// Expectations and traffic
pub use model::{
    ExchangeOutcome, ExpectationEntry, Headers, InterceptedExchange, RecordedEntry,
    RequestDescriptor, ResponseDescriptor, ResponseMessage, ResponseSpec, TransportError,
};

// Matching
pub use matcher::{BodySpec, Predicate, RequestSpec, SharedPredicate, ValueSpec};

// Bodies
pub use body::{Body, BodySource, ByteStream};

// Interception
pub use network::{InterceptAction, InterceptionRegistry, RequestInterceptor};

/// Verkko version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
