//! Action identifiers for freedesktop notifications
//!
//! Freedesktop servers report the *identifier* of the invoked action and
//! the pseudo action `__closed` when the bubble goes away. This maps the
//! request's interaction to identifiers and back to a raw payload.

use crate::outcome::RawPayload;
use crate::request::Interaction;

/// Invoked when the notification body is clicked
pub const DEFAULT_ACTION: &str = "default";

/// Reported by notify-rust when the server closed the notification
pub const CLOSED_ACTION: &str = "__closed";

/// Button standing in for a custom close label
pub const CLOSE_LABEL_ACTION: &str = "close-label";

const ACTION_PREFIX: &str = "action-";

/// Identifier/label pairs registered with one notification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionMap {
    buttons: Vec<(String, String)>,
}

impl ActionMap {
    pub fn for_interaction(interaction: &Interaction) -> Self {
        let mut buttons = vec![(DEFAULT_ACTION.to_string(), String::new())];
        if let Interaction::Actions {
            labels,
            close_label,
            ..
        } = interaction
        {
            for (idx, label) in labels.iter().enumerate() {
                buttons.push((format!("{ACTION_PREFIX}{idx}"), label.clone()));
            }
            if let Some(close) = close_label {
                buttons.push((CLOSE_LABEL_ACTION.to_string(), close.clone()));
            }
        }
        Self { buttons }
    }

    /// (identifier, label) pairs to register, in display order
    pub fn buttons(&self) -> impl Iterator<Item = (&str, &str)> {
        self.buttons.iter().map(|(id, label)| (id.as_str(), label.as_str()))
    }

    fn action_count(&self) -> usize {
        self.buttons
            .iter()
            .filter(|(id, _)| id.starts_with(ACTION_PREFIX))
            .count()
    }

    /// Payload for an invoked action identifier
    ///
    /// Unknown identifiers are reported as a default action without label.
    pub fn payload_for(&self, invoked: &str) -> RawPayload {
        match invoked {
            CLOSED_ACTION | CLOSE_LABEL_ACTION => RawPayload::closed(),
            DEFAULT_ACTION => RawPayload::content_clicked(),
            other => {
                let label = self
                    .buttons
                    .iter()
                    .find(|(id, _)| id == other)
                    .map(|(_, label)| label.clone())
                    .unwrap_or_default();
                let index = other
                    .strip_prefix(ACTION_PREFIX)
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|_| self.action_count() > 1);
                match index {
                    Some(index) => RawPayload::indexed_action(label, index),
                    None => RawPayload::action(label),
                }
            }
        }
    }
}
