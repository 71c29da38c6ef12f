//! macOS Notification Center
//!
//! Uses mac-notification-sys, which posts under the sender's bundle id and
//! blocks in `send` until the user responds. Each submission gets a thread
//! parked in `send`; its response is forwarded to the outcome callback.
//! Notification Center has no call to withdraw a single notification, so
//! release and dismiss only clear the ledger entry.

use super::ledger::Ledger;
use super::{
    resolve_image_ref, DeliveredNotification, NotificationId, NotificationService,
    OutcomeCallback,
};
use crate::errors::ServiceError;
use crate::outcome::RawPayload;
use crate::request::{Interaction, NotificationRequest, SenderIdentity, Sound};
use chrono::Local;
use mac_notification_sys::{MainButton, Notification, NotificationResponse};
use std::sync::atomic::{AtomicU32, Ordering};

/// Dropdown title when several actions come without a label
const DEFAULT_DROPDOWN_LABEL: &str = "Actions";

pub struct MacService {
    ledger: Ledger,
    next_id: AtomicU32,
}

/// Owned copy of what the sending thread needs
struct Content {
    title: String,
    subtitle: Option<String>,
    message: String,
    interaction: Interaction,
    app_icon: Option<String>,
    content_image: Option<String>,
    sound: Sound,
}

impl Content {
    fn from_request(request: &NotificationRequest) -> Self {
        Self {
            title: request.title().unwrap_or_default().to_string(),
            subtitle: request.subtitle().map(String::from),
            message: request.message().to_string(),
            interaction: request.interaction().clone(),
            app_icon: request.app_icon().map(resolve_image_ref),
            content_image: request.content_image().map(resolve_image_ref),
            sound: request.sound().clone(),
        }
    }

    fn labels(&self) -> &[String] {
        match &self.interaction {
            Interaction::Actions { labels, .. } => labels,
            _ => &[],
        }
    }

    /// Post the notification and block until the user responds
    fn send(&self) -> Result<NotificationResponse, ServiceError> {
        let labels: Vec<&str> = self.labels().iter().map(String::as_str).collect();
        let mut notification = Notification::new();
        notification
            .title(&self.title)
            .message(&self.message)
            .wait_for_click(true);

        if let Some(subtitle) = &self.subtitle {
            notification.subtitle(subtitle);
        }
        if let Some(icon) = &self.app_icon {
            notification.app_icon(icon);
        }
        if let Some(image) = &self.content_image {
            notification.content_image(image);
        }
        match &self.sound {
            Sound::Silent => {}
            Sound::Default => {
                notification.sound(mac_notification_sys::Sound::Default);
            }
            Sound::Named(name) => {
                notification.sound(mac_notification_sys::Sound::Custom(name.clone()));
            }
        }

        match &self.interaction {
            Interaction::Plain => {}
            Interaction::Reply { placeholder } => {
                notification.main_button(MainButton::Response(placeholder));
            }
            Interaction::Actions {
                dropdown_label,
                close_label,
                ..
            } => {
                if let [single] = labels.as_slice() {
                    notification.main_button(MainButton::SingleAction(single));
                } else {
                    notification.main_button(MainButton::DropdownActions(
                        dropdown_label.as_deref().unwrap_or(DEFAULT_DROPDOWN_LABEL),
                        &labels,
                    ));
                }
                if let Some(close) = close_label {
                    notification.close_button(close);
                }
            }
        }

        notification
            .send()
            .map_err(|e| ServiceError::Rejected(e.to_string()))
    }
}

/// Map Notification Center's response to a raw payload
///
/// A dropdown pick also reports the label's position.
fn payload_for(response: NotificationResponse, labels: &[String]) -> RawPayload {
    match response {
        NotificationResponse::ActionButton(label) => {
            let index = labels
                .iter()
                .position(|l| *l == label)
                .filter(|_| labels.len() > 1);
            match index {
                Some(index) => RawPayload::indexed_action(label, index),
                None => RawPayload::action(label),
            }
        }
        NotificationResponse::Click => RawPayload::content_clicked(),
        NotificationResponse::Reply(text) => RawPayload::reply(text),
        NotificationResponse::CloseButton(_) | NotificationResponse::None => RawPayload::closed(),
    }
}

impl MacService {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            next_id: AtomicU32::new(1),
        }
    }
}

impl NotificationService for MacService {
    fn ensure_ready(&self, sender: &SenderIdentity) -> Result<(), ServiceError> {
        mac_notification_sys::set_application(sender.as_str())
            .map_err(|e| ServiceError::Unavailable(format!("{sender}: {e}")))?;
        tracing::info!(sender = %sender, ledger = ?self.ledger.path(), "Using Notification Center");
        Ok(())
    }

    fn submit(
        &self,
        sender: &SenderIdentity,
        request: &NotificationRequest,
        on_outcome: OutcomeCallback,
    ) -> Result<NotificationId, ServiceError> {
        if request.ignore_dnd() {
            tracing::debug!("Notification Center offers no do-not-disturb override");
        }

        let id = format!(
            "{}-{}",
            std::process::id(),
            self.next_id.fetch_add(1, Ordering::SeqCst)
        );
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

        let content = Content::from_request(request);
        let thread_id = id.clone();
        std::thread::spawn(move || {
            let payload = match content.send() {
                Ok(response) => {
                    tracing::debug!(id = %thread_id, ?response, "Notification Center responded");
                    payload_for(response, content.labels())
                }
                Err(e) => {
                    tracing::error!(id = %thread_id, error = %e, "Notification Center rejected the notification");
                    RawPayload::closed()
                }
            };
            on_outcome(payload);
        });

        tracing::debug!(id = %id, "Notification posted");
        Ok(NotificationId(id))
    }

    fn release(&self, id: &NotificationId) {
        if let Err(e) = self.ledger.remove(&id.0) {
            tracing::debug!(error = %e, id = %id, "Could not clear ledger entry");
        }
    }

    fn delivered(&self) -> Result<Vec<DeliveredNotification>, ServiceError> {
        self.ledger.entries()
    }

    fn dismiss(&self, id: &NotificationId) -> Result<(), ServiceError> {
        self.ledger.dismiss_with(&id.0, |record| {
            tracing::debug!(id = %record.id, "Notification Center cannot withdraw, forgetting it");
            Ok(())
        })
    }
}
