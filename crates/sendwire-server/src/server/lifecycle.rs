//! Admission and graceful shutdown for in-flight calls.
//!
//! Every call takes an [`InflightGuard`] before doing any work. Shutdown runs
//! in three phases:
//!
//! 1. refuse new calls with [`Error::ServiceShutdown`],
//! 2. wait up to `shutdown_timeout` for in-flight calls to drain,
//! 3. cancel the shared [`CancellationToken`] so remaining stream pumps stop.

use crate::server::telemetry::{decrement_streams_inflight, increment_streams_inflight};
use core::time::Duration;
use sendwire_core::Error;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

pub struct Lifecycle {
    shutting_down: AtomicBool,
    inflight: AtomicUsize,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl Lifecycle {
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self {
            shutting_down: AtomicBool::new(false),
            inflight: AtomicUsize::new(0),
            shutdown_token: CancellationToken::new(),
            shutdown_timeout,
        }
    }

    /// Registers a new in-flight call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`] once shutdown has begun.
    pub fn admit(self: &Arc<Self>) -> Result<InflightGuard, Error> {
        if self.is_shutting_down() {
            return Err(Error::ServiceShutdown);
        }

        self.inflight.fetch_add(1, Ordering::AcqRel);
        increment_streams_inflight();
        Ok(InflightGuard {
            lifecycle: Arc::clone(self),
        })
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    /// Token cancelled in the last shutdown phase.
    pub fn token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Runs the three shutdown phases. Safe to call more than once.
    pub async fn shutdown(&self) {
        // === Phase 1: Stop accepting new calls ===
        tracing::info!("Refusing new calls");
        self.shutting_down.store(true, Ordering::Release);

        // === Phase 2: Wait for in-flight calls to drain ===
        tracing::info!("Draining in-flight calls ({} active)", self.inflight());
        let drained = timeout(self.shutdown_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match drained {
            Ok(()) => tracing::debug!("All in-flight calls drained"),
            Err(_) => tracing::warn!(
                "Graceful drain timed out ({} calls still active)",
                self.inflight()
            ),
        }

        // === Phase 3: Cancel whatever is left ===
        tracing::debug!("Cancelling remaining stream pumps");
        self.shutdown_token.cancel();
    }
}

/// Keeps a call counted as in flight until dropped.
pub struct InflightGuard {
    lifecycle: Arc<Lifecycle>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.lifecycle.inflight.fetch_sub(1, Ordering::AcqRel);
        decrement_streams_inflight();
    }
}
