//! Outcome taxonomy and payload classification
//!
//! The native service reports a loosely structured payload; `classify`
//! turns it into exactly one `Outcome` using a fixed precedence order.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Terminal state of one delivered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    TimedOut,
    ClosedByUser,
    ContentClicked,
    ReplyEntered { text: String },
    /// An empty label means the default action fired without a label.
    /// `index` is the position of the label when several actions were
    /// offered.
    ActionClicked { label: String, index: Option<usize> },
}

/// Event tag used in structured output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTag {
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "closed")]
    Closed,
    #[serde(rename = "contentClicked")]
    ContentClicked,
    #[serde(rename = "actionClicked")]
    ActionClicked,
    #[serde(rename = "replyEntered")]
    ReplyEntered,
}

impl EventTag {
    pub fn as_str(self) -> &'static str {
        match self {
            EventTag::Timeout => "timeout",
            EventTag::Closed => "closed",
            EventTag::ContentClicked => "contentClicked",
            EventTag::ActionClicked => "actionClicked",
            EventTag::ReplyEntered => "replyEntered",
        }
    }
}

impl Outcome {
    pub fn event(&self) -> EventTag {
        match self {
            Outcome::TimedOut => EventTag::Timeout,
            Outcome::ClosedByUser => EventTag::Closed,
            Outcome::ContentClicked => EventTag::ContentClicked,
            Outcome::ReplyEntered { .. } => EventTag::ReplyEntered,
            Outcome::ActionClicked { .. } => EventTag::ActionClicked,
        }
    }

    /// Label or reply text carried by the outcome
    pub fn value(&self) -> Option<&str> {
        match self {
            Outcome::ReplyEntered { text } => Some(text),
            Outcome::ActionClicked { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Index of the clicked action among several offered ones
    pub fn value_index(&self) -> Option<usize> {
        match self {
            Outcome::ActionClicked { index, .. } => *index,
            _ => None,
        }
    }
}

/// Raw report from a native callback
///
/// Fields are mutually exclusive when the service behaves; `classify`
/// tolerates payloads that set several.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPayload {
    pub timed_out: bool,
    pub closed: bool,
    pub content_clicked: bool,
    pub reply_text: Option<String>,
    pub action_label: Option<String>,
    pub action_index: Option<usize>,
}

impl RawPayload {
    #[cfg(test)]
    pub fn timed_out() -> Self {
        Self {
            timed_out: true,
            ..Default::default()
        }
    }

    pub fn closed() -> Self {
        Self {
            closed: true,
            ..Default::default()
        }
    }

    pub fn content_clicked() -> Self {
        Self {
            content_clicked: true,
            ..Default::default()
        }
    }

    #[cfg(any(test, target_os = "macos"))]
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply_text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn action(label: impl Into<String>) -> Self {
        Self {
            action_label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Action picked from several offered ones
    pub fn indexed_action(label: impl Into<String>, index: usize) -> Self {
        Self {
            action_label: Some(label.into()),
            action_index: Some(index),
            ..Default::default()
        }
    }
}

/// Map a raw payload to an outcome
///
/// Precedence: timeout > closed > content click > reply > action.
/// Anything else, including an empty payload, counts as closed.
pub fn classify(payload: &RawPayload) -> Outcome {
    if payload.timed_out {
        return Outcome::TimedOut;
    }
    if payload.closed {
        return Outcome::ClosedByUser;
    }
    if payload.content_clicked {
        return Outcome::ContentClicked;
    }
    if let Some(text) = &payload.reply_text {
        return Outcome::ReplyEntered { text: text.clone() };
    }
    if let Some(label) = &payload.action_label {
        return Outcome::ActionClicked {
            label: label.clone(),
            index: payload.action_index,
        };
    }
    Outcome::ClosedByUser
}

/// An outcome together with when it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub outcome: Outcome,
    pub delivered_at: DateTime<Local>,
    pub activated_at: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_flag_payloads() {
        assert_eq!(classify(&RawPayload::timed_out()), Outcome::TimedOut);
        assert_eq!(classify(&RawPayload::closed()), Outcome::ClosedByUser);
        assert_eq!(
            classify(&RawPayload::content_clicked()),
            Outcome::ContentClicked
        );
        assert_eq!(
            classify(&RawPayload::reply("ship it")),
            Outcome::ReplyEntered {
                text: "ship it".into()
            }
        );
        assert_eq!(
            classify(&RawPayload::action("No")),
            Outcome::ActionClicked {
                label: "No".into(),
                index: None
            }
        );
    }

    #[test]
    fn test_empty_payload_is_closed() {
        assert_eq!(classify(&RawPayload::default()), Outcome::ClosedByUser);
    }

    #[test]
    fn test_precedence_order() {
        let everything = RawPayload {
            timed_out: true,
            closed: true,
            content_clicked: true,
            reply_text: Some("r".into()),
            action_label: Some("a".into()),
            action_index: Some(1),
        };
        assert_eq!(classify(&everything), Outcome::TimedOut);

        let no_timeout = RawPayload {
            timed_out: false,
            ..everything.clone()
        };
        assert_eq!(classify(&no_timeout), Outcome::ClosedByUser);

        let click_reply_action = RawPayload {
            closed: false,
            ..no_timeout.clone()
        };
        assert_eq!(classify(&click_reply_action), Outcome::ContentClicked);

        let reply_action = RawPayload {
            content_clicked: false,
            ..click_reply_action
        };
        assert_eq!(
            classify(&reply_action),
            Outcome::ReplyEntered { text: "r".into() }
        );
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let a: RawPayload =
            serde_json::from_str(r#"{"actionLabel":"Yes","contentClicked":true}"#).unwrap();
        let b: RawPayload =
            serde_json::from_str(r#"{"contentClicked":true,"actionLabel":"Yes"}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(classify(&a), classify(&b));
        assert_eq!(classify(&a), Outcome::ContentClicked);
    }

    #[test]
    fn test_unknown_fields_are_tolerated() {
        let payload: RawPayload = serde_json::from_str(r#"{"somethingElse":1}"#).unwrap();
        assert_eq!(classify(&payload), Outcome::ClosedByUser);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let payload = RawPayload::reply("hello");
        let first = classify(&payload);
        for _ in 0..10 {
            assert_eq!(classify(&payload), first);
        }
    }

    #[test]
    fn test_action_index_is_carried() {
        assert_eq!(
            classify(&RawPayload::indexed_action("Later", 2)),
            Outcome::ActionClicked {
                label: "Later".into(),
                index: Some(2)
            }
        );
        assert_eq!(classify(&RawPayload::action("Go")).value_index(), None);
        assert_eq!(Outcome::ContentClicked.value_index(), None);

        let payload: RawPayload =
            serde_json::from_str(r#"{"actionLabel":"No","actionIndex":1}"#).unwrap();
        assert_eq!(classify(&payload).value_index(), Some(1));
    }

    #[test]
    fn test_event_tags() {
        assert_eq!(Outcome::TimedOut.event().as_str(), "timeout");
        assert_eq!(Outcome::ClosedByUser.event().as_str(), "closed");
        assert_eq!(Outcome::ContentClicked.event().as_str(), "contentClicked");
        assert_eq!(
            Outcome::ActionClicked {
                label: "x".into(),
                index: None
            }
            .event(),
            EventTag::ActionClicked
        );
        assert_eq!(
            serde_json::to_string(&EventTag::ReplyEntered).unwrap(),
            "\"replyEntered\""
        );
    }
}
