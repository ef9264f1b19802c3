// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Traffic diversion
//!
//! The registry that routes outbound requests to the active session, the
//! panic trap, and the exchange log.

mod capture;
mod interceptor_trait;
mod registry;
pub mod trap;

pub use capture::ExchangeLog;
pub use interceptor_trait::{InterceptAction, RequestInterceptor};
pub use registry::{DiversionGuard, InterceptionRegistry};
