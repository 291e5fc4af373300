//! Counting admission gate for in-flight fetches.
//!
//! Wraps a [`tokio::sync::Semaphore`]. Permits are released when dropped, so
//! a fetch that fails still frees its slot. [`AdmissionGate::drain`] closes
//! the semaphore: URLs still waiting are refused, in-flight fetches finish,
//! and the fetcher stops scheduling retries. Backoff sleeps wait on
//! [`AdmissionGate::drained`] so a drain cuts them short.

use std::sync::Arc;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::info;

#[derive(Debug, Clone)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    drain_signal: Arc<Notify>,
    limit: usize,
}

impl AdmissionGate {
    pub fn new(limit: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            drain_signal: Arc::new(Notify::new()),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Wait for a free slot. Returns `None` once the gate is draining.
    pub async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        self.permits.clone().acquire_owned().await.ok()
    }

    /// Stop admitting new fetches and new retry attempts.
    pub fn drain(&self) {
        if !self.permits.is_closed() {
            info!(limit = self.limit, "Draining admission gate");
            self.permits.close();
            self.drain_signal.notify_waiters();
        }
    }

    /// Resolve once the gate is draining; immediately if it already is.
    pub async fn drained(&self) {
        // Registered before the check so a drain in between is not missed.
        let notified = self.drain_signal.notified();
        if self.is_draining() {
            return;
        }
        notified.await;
    }

    pub fn is_draining(&self) -> bool {
        self.permits.is_closed()
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
