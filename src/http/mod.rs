// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP client layer
//!
//! The client code under test issues its requests through. Inside a session
//! its traffic is diverted to the session; outside one it reaches the real
//! network.

mod client;
mod request;
mod response;

pub use client::{HttpClient, HttpClientConfig, RequestBuilder};
pub use request::Request;
pub use response::Response;
