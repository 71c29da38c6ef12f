//! Group registry: list and remove notifications by group id
//!
//! Every call goes straight to the notification service; nothing is
//! cached here. Neither operation waits on a pending delivery.

use crate::errors::ServiceError;
use crate::service::{DeliveredNotification, NotificationId, NotificationService};
use std::collections::HashSet;
use std::sync::Arc;

/// Group id that matches every notification
pub const ALL_GROUPS: &str = "ALL";

pub struct GroupRegistry {
    service: Arc<dyn NotificationService>,
}

fn matches(group: &str, entry: &DeliveredNotification) -> bool {
    group == ALL_GROUPS || entry.group_id.as_deref() == Some(group)
}

impl GroupRegistry {
    pub fn new(service: Arc<dyn NotificationService>) -> Self {
        Self { service }
    }

    /// Notifications in `group` (or all of them), in delivery order
    pub fn list(&self, group: &str) -> Result<Vec<DeliveredNotification>, ServiceError> {
        let mut seen = HashSet::new();
        let mut entries: Vec<DeliveredNotification> = self
            .service
            .delivered()?
            .into_iter()
            .filter(|entry| matches(group, entry))
            .filter(|entry| seen.insert(entry.id.clone()))
            .collect();
        entries.sort_by_key(|entry| entry.delivered_at);
        tracing::debug!(group, count = entries.len(), "Listed notifications");
        Ok(entries)
    }

    /// Dismiss every notification in `group`; unknown groups remove nothing
    ///
    /// Every target is attempted; the first failure is reported afterwards.
    pub fn remove(&self, group: &str) -> Result<usize, ServiceError> {
        let targets = self.list(group)?;
        let mut removed = 0;
        let mut first_error = None;
        for entry in &targets {
            match self.service.dismiss(&NotificationId(entry.id.clone())) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(group, id = %entry.id, error = %e, "Could not remove notification");
                    first_error.get_or_insert(e);
                }
            }
        }
        tracing::info!(group, removed, "Removed notifications");
        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }
}
