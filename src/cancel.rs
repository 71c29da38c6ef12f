//! Termination signal handling
//!
//! SIGINT/SIGTERM while a notification is pending must not leave it on
//! screen. The bridge resolves the pending wait as cancelled and releases
//! the native handle; a delivery in flight then unwinds through
//! `deliver`, which releases whatever it submitted, and `main` exits
//! with status 1. With nothing in flight the listener exits directly.

use crate::coordinator::{CompletionSlot, ReleaseGuard, Resolution};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Exit status after a termination signal
pub const EXIT_CANCELLED: i32 = 1;

/// The delivery currently waiting, if any
#[derive(Default)]
struct Pending {
    in_flight: bool,
    slot: Weak<CompletionSlot>,
    guard: Weak<ReleaseGuard>,
}

/// Bridges process termination requests into the delivery coordinator
#[derive(Clone, Default)]
pub struct CancellationBridge {
    token: CancellationToken,
    pending: Arc<Mutex<Pending>>,
}

/// Marks a delivery as in flight until dropped
pub struct InFlight {
    pending: Arc<Mutex<Pending>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut pending = lock(&self.pending);
        *pending = Pending::default();
    }
}

fn lock(pending: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    match pending.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl CancellationBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Start a delivery; `None` if cancellation was already requested
    ///
    /// While the returned scope lives, `cancel` leaves process exit to
    /// the delivery path.
    pub fn enter(&self) -> Option<InFlight> {
        let mut pending = lock(&self.pending);
        if self.token.is_cancelled() {
            return None;
        }
        pending.in_flight = true;
        Some(InFlight {
            pending: self.pending.clone(),
        })
    }

    /// Make `slot`/`guard` the targets of a later `cancel`
    pub fn track(&self, slot: &Arc<CompletionSlot>, guard: &Arc<ReleaseGuard>) {
        let mut pending = lock(&self.pending);
        pending.slot = Arc::downgrade(slot);
        pending.guard = Arc::downgrade(guard);
    }

    /// Resolve the pending wait as cancelled and release its notification
    ///
    /// Returns true if a delivery is in flight and will finish its own
    /// cleanup. Idempotent; safe when nothing is pending.
    pub fn cancel(&self) -> bool {
        let (in_flight, slot, guard) = {
            let pending = lock(&self.pending);
            self.token.cancel();
            (
                pending.in_flight,
                pending.slot.upgrade(),
                pending.guard.upgrade(),
            )
        };
        if let Some(slot) = slot {
            slot.resolve(Resolution::Cancelled);
        }
        if let Some(guard) = guard {
            guard.release();
        }
        in_flight
    }

    /// Listen for termination signals for the rest of the process
    ///
    /// With no delivery in flight the first signal exits with
    /// `EXIT_CANCELLED`. Otherwise the delivery unwinds and `main` exits;
    /// a second signal forces the exit.
    pub fn install(&self) -> JoinHandle<()> {
        let bridge = self.clone();
        tokio::spawn(async move {
            match termination_requested().await {
                Ok(signal) => {
                    tracing::info!(signal, "Termination requested, cleaning up");
                    if !bridge.cancel() {
                        std::process::exit(EXIT_CANCELLED);
                    }
                    if let Ok(signal) = termination_requested().await {
                        tracing::warn!(signal, "Second termination request, exiting now");
                        std::process::exit(EXIT_CANCELLED);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not listen for termination signals");
                }
            }
        })
    }
}

#[cfg(unix)]
async fn termination_requested() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = terminate.recv() => Ok("SIGTERM"),
        _ = interrupt.recv() => Ok("SIGINT"),
    }
}

#[cfg(not(unix))]
async fn termination_requested() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Outcome;
    use crate::service::memory::{Behavior, MemoryService};
    use crate::service::NotificationId;

    #[test]
    fn test_cancel_with_nothing_pending() {
        let bridge = CancellationBridge::new();
        assert!(!bridge.cancel());
        assert!(!bridge.cancel());
        assert!(bridge.is_cancelled());
    }

    #[test]
    fn test_cancel_resolves_and_releases() {
        let service = Arc::new(MemoryService::new(Behavior::Silent));
        let bridge = CancellationBridge::new();
        let (slot, mut receiver) = CompletionSlot::new();
        let guard = Arc::new(ReleaseGuard::new(
            service.clone(),
            NotificationId("5".into()),
        ));
        bridge.track(&slot, &guard);

        bridge.cancel();
        assert_eq!(receiver.try_recv().unwrap(), Resolution::Cancelled);
        assert!(guard.is_released());

        // Second cancel is a no-op
        bridge.cancel();
        assert_eq!(service.released(), vec!["5".to_string()]);
    }

    #[test]
    fn test_cancel_after_outcome_keeps_outcome() {
        let service = Arc::new(MemoryService::new(Behavior::Silent));
        let bridge = CancellationBridge::new();
        let (slot, mut receiver) = CompletionSlot::new();
        let guard = Arc::new(ReleaseGuard::new(
            service.clone(),
            NotificationId("6".into()),
        ));
        bridge.track(&slot, &guard);

        assert!(slot.resolve(Resolution::Outcome(Outcome::ContentClicked)));
        bridge.cancel();
        assert_eq!(
            receiver.try_recv().unwrap(),
            Resolution::Outcome(Outcome::ContentClicked)
        );
    }

    #[test]
    fn test_dropped_delivery_is_not_kept_alive() {
        let service = Arc::new(MemoryService::new(Behavior::Silent));
        let bridge = CancellationBridge::new();
        {
            let (slot, _receiver) = CompletionSlot::new();
            let guard = Arc::new(ReleaseGuard::new(
                service.clone(),
                NotificationId("7".into()),
            ));
            bridge.track(&slot, &guard);
        }
        // Guard dropped (and released) with its scope
        assert_eq!(service.released(), vec!["7".to_string()]);
        bridge.cancel();
        assert_eq!(service.released(), vec!["7".to_string()]);
    }

    #[test]
    fn test_in_flight_delivery_defers_exit() {
        let bridge = CancellationBridge::new();
        let scope = bridge.enter().unwrap();
        assert!(bridge.cancel());
        drop(scope);
        assert!(!bridge.cancel());
    }

    #[test]
    fn test_enter_after_cancel_is_refused() {
        let bridge = CancellationBridge::new();
        bridge.cancel();
        assert!(bridge.enter().is_none());
    }
}
