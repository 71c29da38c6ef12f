//! Output rendering
//!
//! Two encodings of the same outcome: a single token line for shell
//! scripts and a JSON document. The token vocabulary is the public
//! contract:
//!
//! | event            | token                              |
//! |------------------|------------------------------------|
//! | `timeout`        | `@TIMEOUT`                         |
//! | `closed`         | `@CLOSED`                          |
//! | `contentClicked` | `@CONTENTCLICKED`                  |
//! | `actionClicked`  | the label, or `@ACTIONCLICKED`     |
//! | `replyEntered`   | the reply, or `@ACTIONCLICKED`     |
//!
//! JSON also carries `valueIndex` for a pick among several actions.

use crate::outcome::{Activation, EventTag, Outcome};
use crate::request::OutputMode;
use crate::service::DeliveredNotification;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in every JSON document
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

pub const TOKEN_TIMEOUT: &str = "@TIMEOUT";
pub const TOKEN_CLOSED: &str = "@CLOSED";
pub const TOKEN_CONTENT_CLICKED: &str = "@CONTENTCLICKED";
pub const TOKEN_ACTION_CLICKED: &str = "@ACTIONCLICKED";

fn timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Structured form of an activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDocument {
    pub event: EventTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Position of the clicked action when several were offered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_index: Option<usize>,
    pub delivered_at: String,
    pub activated_at: String,
}

impl From<&Activation> for EventDocument {
    fn from(activation: &Activation) -> Self {
        Self {
            event: activation.outcome.event(),
            value: activation.outcome.value().map(String::from),
            value_index: activation.outcome.value_index(),
            delivered_at: timestamp(&activation.delivered_at),
            activated_at: timestamp(&activation.activated_at),
        }
    }
}

/// Token line for an event tag and optional value
pub fn token_for(event: EventTag, value: Option<&str>) -> String {
    match event {
        EventTag::Timeout => TOKEN_TIMEOUT.to_string(),
        EventTag::Closed => TOKEN_CLOSED.to_string(),
        EventTag::ContentClicked => TOKEN_CONTENT_CLICKED.to_string(),
        EventTag::ActionClicked | EventTag::ReplyEntered => match value {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => TOKEN_ACTION_CLICKED.to_string(),
        },
    }
}

/// Token line for an outcome
pub fn token(outcome: &Outcome) -> String {
    token_for(outcome.event(), outcome.value())
}

/// Pretty JSON document for an activation
pub fn structured(activation: &Activation) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&EventDocument::from(activation))
}

/// Render an activation in the requested mode
pub fn render(activation: &Activation, mode: OutputMode) -> serde_json::Result<String> {
    match mode {
        OutputMode::Token => Ok(token(&activation.outcome)),
        OutputMode::Json => structured(activation),
    }
}

/// One row of `-list` output
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListingRow<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<&'a str>,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtitle: Option<&'a str>,
    message: &'a str,
    delivered_at: String,
}

/// One compact JSON object per line; empty input renders nothing
pub fn listing(entries: &[DeliveredNotification]) -> serde_json::Result<String> {
    let mut out = String::new();
    for entry in entries {
        let row = ListingRow {
            id: &entry.id,
            group_id: entry.group_id.as_deref(),
            title: &entry.title,
            subtitle: entry.subtitle.as_deref(),
            message: &entry.message,
            delivered_at: timestamp(&entry.delivered_at),
        };
        out.push_str(&serde_json::to_string(&row)?);
        out.push('\n');
    }
    Ok(out)
}
