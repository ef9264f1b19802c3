// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Process-wide interception registry
//!
//! At most one session diverts traffic at a time. `acquire` waits for the
//! current holder to finish; the returned guard releases diversion and the
//! panic trap when dropped, on every exit path.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::interceptor_trait::RequestInterceptor;
use super::trap::{self, PanicSink};

lazy_static::lazy_static! {
    static ref GLOBAL: InterceptionRegistry = InterceptionRegistry::new();
}

/// Single-holder registry of the active interceptor
pub struct InterceptionRegistry {
    gate: Arc<Mutex<()>>,
    active: RwLock<Option<Arc<dyn RequestInterceptor>>>,
}

impl Default for InterceptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InterceptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Mutex::new(())),
            active: RwLock::new(None),
        }
    }

    /// The registry the diverted client consults
    pub fn global() -> &'static InterceptionRegistry {
        &GLOBAL
    }

    /// Become the single holder, waiting for any current one to release
    pub async fn acquire(
        &self,
        interceptor: Arc<dyn RequestInterceptor>,
        sink: Option<PanicSink>,
    ) -> DiversionGuard<'_> {
        let permit = self.gate.clone().lock_owned().await;

        *self.active.write() = Some(interceptor);
        let traps = sink.is_some();
        if let Some(sink) = sink {
            trap::set_sink(sink);
        }
        tracing::debug!("Traffic diversion installed");

        DiversionGuard {
            registry: self,
            traps,
            _permit: permit,
        }
    }

    /// The active interceptor, if a session holds the registry
    pub fn current(&self) -> Option<Arc<dyn RequestInterceptor>> {
        self.active.read().clone()
    }

    /// Check if traffic is currently diverted
    pub fn is_active(&self) -> bool {
        self.active.read().is_some()
    }
}

/// Proof of holding the registry; releases on drop
pub struct DiversionGuard<'a> {
    registry: &'a InterceptionRegistry,
    traps: bool,
    _permit: OwnedMutexGuard<()>,
}

impl Drop for DiversionGuard<'_> {
    fn drop(&mut self) {
        self.registry.active.write().take();
        if self.traps {
            trap::clear();
        }
        tracing::debug!("Traffic diversion released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RequestDescriptor, ResponseMessage};
    use crate::network::InterceptAction;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    struct Fixed(AtomicU64);

    #[async_trait]
    impl RequestInterceptor for Fixed {
        fn admit(&self) -> u64 {
            self.0.fetch_add(1, Ordering::SeqCst)
        }

        async fn intercept(&self, _ticket: u64, _request: RequestDescriptor) -> InterceptAction {
            InterceptAction::Respond(ResponseMessage::new(204))
        }
    }

    #[tokio::test]
    async fn test_release_on_drop() {
        let registry = InterceptionRegistry::new();
        {
            let _guard = registry.acquire(Arc::new(Fixed(AtomicU64::new(0))), None).await;
            assert!(registry.is_active());
            assert_eq!(registry.current().map(|i| i.admit()), Some(0));
        }
        assert!(!registry.is_active());
    }

    #[tokio::test]
    async fn test_single_holder() {
        let registry = Arc::new(InterceptionRegistry::new());
        let guard = registry.acquire(Arc::new(Fixed(AtomicU64::new(0))), None).await;

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _guard = registry.acquire(Arc::new(Fixed(AtomicU64::new(10))), None).await;
                registry.current().map(|i| i.admit())
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        assert_eq!(waiter.await.unwrap(), Some(10));
    }
}
