//! Delivery coordinator
//!
//! Submits one notification and waits until exactly one of these resolves
//! the completion slot:
//! - the service's outcome callback (any thread)
//! - the local timeout watchdog
//! - the cancellation bridge (synchronously, from the signal task)
//!
//! The first resolution wins; the rest are dropped. The native handle is
//! released on every path out of `deliver`.

use crate::cancel::CancellationBridge;
use crate::errors::{AlertError, Result};
use crate::outcome::{classify, Activation, Outcome};
use crate::registry::GroupRegistry;
use crate::request::{NotificationRequest, SenderIdentity};
use crate::service::{NotificationId, NotificationService, OutcomeCallback};
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// What ended the wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Outcome(Outcome),
    Cancelled,
}

/// Single-use completion signal
///
/// The atomic flag picks the winner; the mutex only hands the sender out
/// once to that winner.
pub struct CompletionSlot {
    completed: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<Resolution>>>,
}

impl CompletionSlot {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<Resolution>) {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Self {
            completed: AtomicBool::new(false),
            sender: Mutex::new(Some(tx)),
        });
        (slot, rx)
    }

    /// Publish a resolution; returns false if another one got there first
    pub fn resolve(&self, resolution: Resolution) -> bool {
        if self
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(?resolution, "Delivery already resolved, discarding");
            return false;
        }
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        sender.is_some_and(|tx| tx.send(resolution).is_ok())
    }

    #[cfg(test)]
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

/// Releases a submitted notification exactly once
///
/// Also releases on drop so early returns and panics cannot leak the
/// native handle.
pub struct ReleaseGuard {
    service: Arc<dyn NotificationService>,
    id: NotificationId,
    released: AtomicBool,
}

impl ReleaseGuard {
    pub fn new(service: Arc<dyn NotificationService>, id: NotificationId) -> Self {
        Self {
            service,
            id,
            released: AtomicBool::new(false),
        }
    }

    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            tracing::debug!(id = %self.id, "Releasing notification");
            self.service.release(&self.id);
        }
    }

    #[cfg(test)]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Aborts helper tasks when the wait ends
struct TaskGuard(Vec<JoinHandle<()>>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

pub struct DeliveryCoordinator {
    service: Arc<dyn NotificationService>,
    sender: SenderIdentity,
    bridge: CancellationBridge,
}

impl DeliveryCoordinator {
    pub fn new(
        service: Arc<dyn NotificationService>,
        sender: SenderIdentity,
        bridge: CancellationBridge,
    ) -> Self {
        Self {
            service,
            sender,
            bridge,
        }
    }

    /// Show `request` and wait for its outcome
    ///
    /// Returns the outcome, or `Cancelled` if the bridge fired first.
    pub async fn deliver(&self, request: &NotificationRequest) -> Result<Activation> {
        request.validate()?;

        // Held until every path below has released what it submitted
        let Some(_in_flight) = self.bridge.enter() else {
            tracing::debug!("Cancellation requested before submission");
            return Err(AlertError::Cancelled);
        };

        // A new notification replaces earlier ones in the same group
        if let Some(group) = request.group_id() {
            if let Err(e) = GroupRegistry::new(self.service.clone()).remove(group) {
                tracing::warn!(group, error = %e, "Could not replace earlier notifications");
            }
        }
        if self.bridge.is_cancelled() {
            return Err(AlertError::Cancelled);
        }

        let (slot, receiver) = CompletionSlot::new();
        let callback_slot = slot.clone();
        let on_outcome: OutcomeCallback = Box::new(move |payload| {
            let outcome = classify(&payload);
            if !callback_slot.resolve(Resolution::Outcome(outcome)) {
                tracing::debug!(?payload, "Ignoring late notification callback");
            }
        });

        let id = self
            .service
            .submit(&self.sender, request, on_outcome)
            .map_err(AlertError::Submission)?;
        let delivered_at = Local::now();
        tracing::info!(id = %id, group = ?request.group_id(), timeout = ?request.timeout(), "Notification delivered");

        let guard = Arc::new(ReleaseGuard::new(self.service.clone(), id));
        self.bridge.track(&slot, &guard);
        // A cancel that raced the submission saw nothing to track
        if self.bridge.is_cancelled() {
            slot.resolve(Resolution::Cancelled);
        }

        let mut tasks = Vec::new();
        if let Some(timeout) = request.timeout() {
            let watchdog_slot = slot.clone();
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::debug!(?timeout, "Watchdog expired");
                watchdog_slot.resolve(Resolution::Outcome(Outcome::TimedOut));
            }));
        }
        let tasks = TaskGuard(tasks);

        let resolution = receiver.await;
        drop(tasks);
        guard.release();

        match resolution {
            Ok(Resolution::Outcome(outcome)) => {
                tracing::info!(event = outcome.event().as_str(), value = ?outcome.value(), "Notification resolved");
                Ok(Activation {
                    outcome,
                    delivered_at,
                    activated_at: Local::now(),
                })
            }
            Ok(Resolution::Cancelled) => {
                tracing::info!("Delivery cancelled");
                Err(AlertError::Cancelled)
            }
            Err(_) => {
                tracing::warn!("Completion channel closed without a resolution");
                Err(AlertError::Cancelled)
            }
        }
    }
}
