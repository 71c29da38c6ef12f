//! Native notification service seam
//!
//! The coordinator and registry only talk to `NotificationService`. The
//! freedesktop implementation lives in `desktop`, Notification Center in
//! `macos`; tests use `memory`.

pub mod action_map;
#[cfg(all(unix, not(target_os = "macos")))]
mod desktop;
pub mod ledger;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(test)]
pub mod memory;

use crate::errors::ServiceError;
use crate::outcome::RawPayload;
use crate::request::{NotificationRequest, SenderIdentity};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Callback the service invokes once with the notification's outcome
///
/// May run on any thread.
pub type OutcomeCallback = Box<dyn FnOnce(RawPayload) + Send + 'static>;

/// Opaque handle to a submitted notification
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationId(pub String);

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A notification currently held by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredNotification {
    pub id: String,
    pub group_id: Option<String>,
    pub sender: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub message: String,
    pub delivered_at: DateTime<Local>,
}

/// Turn an icon/image reference into something the server can load
///
/// `file://` URLs become paths, relative paths are made absolute and any
/// other URL is passed through untouched.
pub(crate) fn resolve_image_ref(reference: &str) -> String {
    if let Ok(url) = url::Url::parse(reference) {
        if url.scheme() == "file" {
            if let Ok(path) = url.to_file_path() {
                return path.to_string_lossy().to_string();
            }
        }
        // Single-letter schemes are Windows drive letters, not URLs
        if url.scheme().len() > 1 {
            return reference.to_string();
        }
    }
    let path = Path::new(reference);
    if path.is_absolute() {
        return reference.to_string();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path).to_string_lossy().to_string())
        .unwrap_or_else(|_| reference.to_string())
}

/// Capability offered by the platform's notification server
pub trait NotificationService: Send + Sync {
    /// Check the server is reachable for this sender
    fn ensure_ready(&self, sender: &SenderIdentity) -> Result<(), ServiceError>;

    /// Show a notification and arrange for `on_outcome` to be called once
    ///
    /// Returns as soon as the server accepted the request.
    fn submit(
        &self,
        sender: &SenderIdentity,
        request: &NotificationRequest,
        on_outcome: OutcomeCallback,
    ) -> Result<NotificationId, ServiceError>;

    /// Drop our handle on a submitted notification
    ///
    /// The server may already have disposed of it; must not fail.
    fn release(&self, id: &NotificationId);

    /// Notifications currently delivered, in delivery order
    fn delivered(&self) -> Result<Vec<DeliveredNotification>, ServiceError>;

    /// Dismiss one delivered notification
    fn dismiss(&self, id: &NotificationId) -> Result<(), ServiceError>;
}

/// Connect to the platform notification server
#[cfg(all(unix, not(target_os = "macos")))]
pub fn connect(ledger_path: PathBuf) -> Result<Arc<dyn NotificationService>, ServiceError> {
    Ok(Arc::new(desktop::DesktopService::new(ledger::Ledger::new(
        ledger_path,
    ))))
}

/// Connect to the platform notification server
#[cfg(target_os = "macos")]
pub fn connect(ledger_path: PathBuf) -> Result<Arc<dyn NotificationService>, ServiceError> {
    Ok(Arc::new(macos::MacService::new(ledger::Ledger::new(
        ledger_path,
    ))))
}

/// Connect to the platform notification server
#[cfg(not(unix))]
pub fn connect(ledger_path: PathBuf) -> Result<Arc<dyn NotificationService>, ServiceError> {
    let _ = ledger_path;
    Err(ServiceError::Unavailable(
        "no supported notification server on this platform".to_string(),
    ))
}
