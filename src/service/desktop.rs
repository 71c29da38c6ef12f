//! Freedesktop desktop notifications
//!
//! Uses notify-rust to talk to the session's notification server over
//! D-Bus. Each submitted notification gets a waiter thread blocked in
//! `wait_for_action`; whatever the server reports there is forwarded to
//! the outcome callback. Timeouts are not delegated to the server: the
//! notification never expires and the coordinator's watchdog closes it.

use super::action_map::ActionMap;
use super::ledger::Ledger;
use super::{
    resolve_image_ref, DeliveredNotification, NotificationId, NotificationService,
    OutcomeCallback,
};
use crate::errors::ServiceError;
use crate::request::{Interaction, NotificationRequest, SenderIdentity, Sound};
use chrono::Local;
use notify_rust::{Hint, Notification, Timeout, Urgency};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Sound theme name for the platform default sound
const DEFAULT_SOUND_NAME: &str = "message-new-instant";

pub struct DesktopService {
    ledger: Ledger,
    /// Ids the server already reported an action or close for
    settled: Arc<Mutex<HashSet<u32>>>,
}

fn body_text(subtitle: Option<&str>, message: &str) -> String {
    match subtitle {
        Some(sub) => format!("{sub}\n{message}"),
        None => message.to_string(),
    }
}

fn sound_hint(sound: &Sound) -> Hint {
    match sound {
        Sound::Silent => Hint::SuppressSound(true),
        Sound::Default => Hint::SoundName(DEFAULT_SOUND_NAME.to_string()),
        Sound::Named(name) => Hint::SoundName(name.clone()),
    }
}

fn build(sender: &SenderIdentity, request: &NotificationRequest, actions: &ActionMap) -> Notification {
    let mut notification = Notification::new();
    notification
        .appname(sender.as_str())
        .summary(request.title().unwrap_or_default())
        .body(&body_text(request.subtitle(), request.message()))
        .hint(sound_hint(request.sound()))
        .timeout(Timeout::Never);

    if let Some(icon) = request.app_icon() {
        notification.icon(&resolve_image_ref(icon));
    }
    if let Some(image) = request.content_image() {
        notification.hint(Hint::ImagePath(resolve_image_ref(image)));
    }
    if request.ignore_dnd() {
        // Critical notifications bypass do-not-disturb on the common servers
        notification.urgency(Urgency::Critical);
    }
    for (id, label) in actions.buttons() {
        notification.action(id, label);
    }
    notification
}

/// Replace the notification with a silent copy and close it
fn close(record: &DeliveredNotification) -> Result<(), ServiceError> {
    let id: u32 = record
        .id
        .parse()
        .map_err(|_| ServiceError::Rejected(format!("invalid notification id '{}'", record.id)))?;
    let handle = Notification::new()
        .appname(&record.sender)
        .summary(&record.title)
        .body(&body_text(record.subtitle.as_deref(), &record.message))
        .hint(Hint::SuppressSound(true))
        .timeout(Timeout::Never)
        .id(id)
        .show()
        .map_err(|e| ServiceError::Rejected(e.to_string()))?;
    handle.close();
    Ok(())
}

impl DesktopService {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            settled: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn take_settled(&self, id: &NotificationId) -> bool {
        let Ok(raw) = id.0.parse::<u32>() else {
            return false;
        };
        match self.settled.lock() {
            Ok(mut settled) => settled.remove(&raw),
            Err(poisoned) => poisoned.into_inner().remove(&raw),
        }
    }
}

impl NotificationService for DesktopService {
    fn ensure_ready(&self, sender: &SenderIdentity) -> Result<(), ServiceError> {
        let info = notify_rust::get_server_information()
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?;
        tracing::info!(
            server = %info.name,
            vendor = %info.vendor,
            version = %info.version,
            sender = %sender,
            ledger = ?self.ledger.path(),
            "Connected to notification server"
        );
        Ok(())
    }

    fn submit(
        &self,
        sender: &SenderIdentity,
        request: &NotificationRequest,
        on_outcome: OutcomeCallback,
    ) -> Result<NotificationId, ServiceError> {
        if matches!(request.interaction(), Interaction::Reply { .. }) {
            return Err(ServiceError::Rejected(
                "reply notifications are not supported by freedesktop notification servers"
                    .to_string(),
            ));
        }

        if let Interaction::Actions { dropdown_label, .. } = request.interaction() {
            let supports_actions = notify_rust::get_capabilities()
                .map(|caps| caps.iter().any(|c| c == "actions"))
                .unwrap_or(false);
            if !supports_actions {
                tracing::warn!("Notification server does not advertise action support");
            }
            if dropdown_label.is_some() {
                tracing::debug!("Dropdown label ignored, actions are shown as buttons");
            }
        }

        let actions = ActionMap::for_interaction(request.interaction());
        let handle = build(sender, request, &actions)
            .show()
            .map_err(|e| ServiceError::Rejected(e.to_string()))?;
        let raw_id = handle.id();
        let id = raw_id.to_string();

        let record = DeliveredNotification {
            id: id.clone(),
            group_id: request.group_id().map(String::from),
            sender: sender.to_string(),
            title: request.title().unwrap_or_default().to_string(),
            subtitle: request.subtitle().map(String::from),
            message: request.message().to_string(),
            delivered_at: Local::now(),
        };
        if let Err(e) = self.ledger.record(record) {
            tracing::warn!(error = %e, id = %id, "Could not record notification in ledger");
        }

        // The server's signals arrive on this thread, not on the caller's
        let settled = self.settled.clone();
        std::thread::spawn(move || {
            handle.wait_for_action(move |action| {
                tracing::debug!(action, "Notification server reported action");
                match settled.lock() {
                    Ok(mut ids) => ids.insert(raw_id),
                    Err(poisoned) => poisoned.into_inner().insert(raw_id),
                };
                on_outcome(actions.payload_for(action));
            });
        });

        tracing::debug!(id = %id, "Notification shown");
        Ok(NotificationId(id))
    }

    fn release(&self, id: &NotificationId) {
        // Already gone from the screen, only the ledger entry is left
        if self.take_settled(id) {
            if let Err(e) = self.ledger.remove(&id.0) {
                tracing::debug!(error = %e, id = %id, "Could not clear ledger entry");
            }
            return;
        }
        if let Err(e) = self.dismiss(id) {
            tracing::debug!(error = %e, id = %id, "Release failed, notification likely gone");
        }
    }

    fn delivered(&self) -> Result<Vec<DeliveredNotification>, ServiceError> {
        self.ledger.entries()
    }

    fn dismiss(&self, id: &NotificationId) -> Result<(), ServiceError> {
        self.ledger.dismiss_with(&id.0, close)
    }
}
