// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session configuration and mode selection

use std::fmt;
use std::time::Duration;

/// Environment variable forcing every mocked session into verify mode
pub const ENV_VERIFY: &str = "VERKKO_VERIFY";

/// Environment variable forcing every file-backed session into capture mode
pub const ENV_WRITE: &str = "VERKKO_WRITE";

/// Response headers that legitimately differ between two runs
pub const VOLATILE_HEADERS: &[&str] = &[
    "date",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "content-length",
];

/// What a session does with intercepted traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Answer from the declared expectations
    Mock,
    /// Forward to the real network and keep the exchanges
    Record,
    /// Forward to the real network and write the exchanges to a fixture file
    Capture,
    /// Answer from a fixture file
    Replay,
    /// Answer from the expectations, then check them against the live service
    Verify,
}

impl Mode {
    /// Check if traffic reaches the real network during the run
    pub fn forwards(&self) -> bool {
        matches!(self, Mode::Record | Mode::Capture)
    }

    /// Check if traffic is answered from expectations
    pub fn mocks(&self) -> bool {
        !self.forwards()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Mock => "mock",
            Mode::Record => "record",
            Mode::Capture => "capture",
            Mode::Replay => "replay",
            Mode::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Run every mocked session in verify mode
    pub force_verify: bool,
    /// Run every file-backed session in capture mode
    pub force_write: bool,
    /// Timeout for requests reaching the live service
    pub upstream_timeout: Duration,
    /// Response headers never compared during verification
    pub volatile_headers: Vec<String>,
    /// Accept invalid certificates when talking to the live service
    pub accept_invalid_certs: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            force_verify: false,
            force_write: false,
            upstream_timeout: Duration::from_secs(30),
            volatile_headers: VOLATILE_HEADERS.iter().map(|h| h.to_string()).collect(),
            accept_invalid_certs: false,
        }
    }
}

impl SessionConfig {
    /// Create a new session config
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus the process environment overrides
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults plus overrides from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = |name: &str| lookup(name).map(|v| is_truthy(&v)).unwrap_or(false);

        let config = Self {
            force_verify: enabled(ENV_VERIFY),
            force_write: enabled(ENV_WRITE),
            ..Default::default()
        };

        if config.force_verify || config.force_write {
            tracing::debug!(
                force_verify = config.force_verify,
                force_write = config.force_write,
                "Mode overrides from environment"
            );
        }

        config
    }

    /// Force verify mode
    pub fn force_verify(mut self, force: bool) -> Self {
        self.force_verify = force;
        self
    }

    /// Force capture mode for file-backed sessions
    pub fn force_write(mut self, force: bool) -> Self {
        self.force_write = force;
        self
    }

    /// Set the live request timeout
    pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    /// Add a header ignored during verification
    pub fn volatile_header(mut self, name: impl Into<String>) -> Self {
        self.volatile_headers.push(name.into());
        self
    }

    /// Accept invalid certificates upstream
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert!(!config.force_verify);
        assert!(!config.force_write);
        assert!(config.volatile_headers.iter().any(|h| h == "date"));
    }

    #[test]
    fn test_env_overrides() {
        let config = SessionConfig::from_lookup(lookup(&[(ENV_VERIFY, "true"), (ENV_WRITE, "0")]));
        assert!(config.force_verify);
        assert!(!config.force_write);

        let config = SessionConfig::from_lookup(lookup(&[(ENV_WRITE, "YES")]));
        assert!(config.force_write);
        assert!(!config.force_verify);
    }

    #[test]
    fn test_mode_forwarding() {
        assert!(Mode::Capture.forwards());
        assert!(Mode::Record.forwards());
        assert!(Mode::Verify.mocks());
        assert_eq!(Mode::Replay.to_string(), "replay");
    }
}
