//! In-memory notification service for tests
//!
//! Outcomes are fired from a separate OS thread, like a real server's
//! signal thread would.

use super::{DeliveredNotification, NotificationId, NotificationService, OutcomeCallback};
use crate::errors::ServiceError;
use crate::outcome::RawPayload;
use crate::request::{NotificationRequest, SenderIdentity};
use chrono::Local;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// How the fake server reacts to a submission
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Fire `payload` after `after`
    Respond { payload: RawPayload, after: Duration },
    /// Never report anything (callbacks can be fired manually)
    Silent,
    /// Refuse the submission
    Reject(String),
}

type SubmitHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct State {
    delivered: Vec<DeliveredNotification>,
    callbacks: HashMap<String, OutcomeCallback>,
    released: Vec<String>,
    submitted: usize,
    on_submit: Option<SubmitHook>,
    stuck: HashSet<String>,
}

pub struct MemoryService {
    behavior: Behavior,
    available: bool,
    next_id: AtomicU32,
    state: Mutex<State>,
}

impl MemoryService {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            available: true,
            next_id: AtomicU32::new(1),
            state: Mutex::new(State::default()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Behavior::Silent)
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Seed a notification as if another process had delivered it
    pub fn seed(&self, group: Option<&str>, title: &str) -> NotificationId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.state().delivered.push(DeliveredNotification {
            id: id.clone(),
            group_id: group.map(String::from),
            sender: "com.apple.Terminal".to_string(),
            title: title.to_string(),
            subtitle: None,
            message: title.to_string(),
            delivered_at: Local::now(),
        });
        NotificationId(id)
    }

    /// Fire the pending callback of `id`, returns false if none is left
    pub fn fire(&self, id: &NotificationId, payload: RawPayload) -> bool {
        let callback = self.state().callbacks.remove(&id.0);
        match callback {
            Some(cb) => {
                cb(payload);
                true
            }
            None => false,
        }
    }

    /// Run `hook` inside the next `submit`, after the notification is shown
    pub fn on_submit(&self, hook: impl FnOnce() + Send + 'static) {
        self.state().on_submit = Some(Box::new(hook));
    }

    /// Make `dismiss` of `id` fail and leave it delivered
    pub fn fail_dismiss(&self, id: &NotificationId) {
        self.state().stuck.insert(id.0.clone());
    }

    pub fn released(&self) -> Vec<String> {
        self.state().released.clone()
    }

    pub fn submitted(&self) -> usize {
        self.state().submitted
    }

    /// Id of the most recent submission
    pub fn last_id(&self) -> Option<NotificationId> {
        let next = self.next_id.load(Ordering::SeqCst);
        (next > 1).then(|| NotificationId((next - 1).to_string()))
    }
}

impl NotificationService for MemoryService {
    fn ensure_ready(&self, _sender: &SenderIdentity) -> Result<(), ServiceError> {
        if self.available {
            Ok(())
        } else {
            Err(ServiceError::Unavailable("memory service offline".to_string()))
        }
    }

    fn submit(
        &self,
        sender: &SenderIdentity,
        request: &NotificationRequest,
        on_outcome: OutcomeCallback,
    ) -> Result<NotificationId, ServiceError> {
        if let Behavior::Reject(reason) = &self.behavior {
            return Err(ServiceError::Rejected(reason.clone()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let hook = {
            let mut state = self.state();
            state.submitted += 1;
            state.delivered.push(DeliveredNotification {
                id: id.clone(),
                group_id: request.group_id().map(String::from),
                sender: sender.to_string(),
                title: request.title().unwrap_or_default().to_string(),
                subtitle: request.subtitle().map(String::from),
                message: request.message().to_string(),
                delivered_at: Local::now(),
            });
            state.on_submit.take()
        };
        if let Some(hook) = hook {
            hook();
        }

        match &self.behavior {
            Behavior::Respond { payload, after } => {
                let payload = payload.clone();
                let after = *after;
                std::thread::spawn(move || {
                    std::thread::sleep(after);
                    on_outcome(payload);
                });
            }
            _ => {
                self.state().callbacks.insert(id.clone(), on_outcome);
            }
        }
        Ok(NotificationId(id))
    }

    fn release(&self, id: &NotificationId) {
        let mut state = self.state();
        state.released.push(id.0.clone());
        state.delivered.retain(|n| n.id != id.0);
    }

    fn delivered(&self) -> Result<Vec<DeliveredNotification>, ServiceError> {
        Ok(self.state().delivered.clone())
    }

    fn dismiss(&self, id: &NotificationId) -> Result<(), ServiceError> {
        let mut state = self.state();
        if state.stuck.contains(&id.0) {
            return Err(ServiceError::Rejected(format!("cannot close {id}")));
        }
        state.delivered.retain(|n| n.id != id.0);
        Ok(())
    }
}
