//! Notification request model
//!
//! A `NotificationRequest` is built once at the CLI boundary through
//! `RequestBuilder`, handed to the delivery coordinator, and never mutated
//! afterwards. All fields are private; the native adapters read them
//! through accessors.

use crate::errors::{AlertError, Result};
use std::time::Duration;

/// Default sender identity when neither flag, env nor config sets one
pub const DEFAULT_SENDER: &str = "com.apple.Terminal";

/// Default notification title
pub const DEFAULT_TITLE: &str = "Terminal";

/// Sender identity captured once at startup and passed to every native call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity(String);

impl SenderIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.trim().is_empty() {
            Self(DEFAULT_SENDER.to_string())
        } else {
            Self(id)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SenderIdentity {
    fn default() -> Self {
        Self(DEFAULT_SENDER.to_string())
    }
}

impl std::fmt::Display for SenderIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the user can respond to the notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// Plain alert, no buttons
    Plain,
    /// Reply-style alert with a text field
    Reply { placeholder: String },
    /// One or more action buttons
    ///
    /// `dropdown_label` and `close_label` are only kept with two or more labels.
    Actions {
        labels: Vec<String>,
        dropdown_label: Option<String>,
        close_label: Option<String>,
    },
}

/// Sound played on delivery
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Sound {
    #[default]
    Silent,
    /// The platform's default notification sound
    Default,
    Named(String),
}

impl Sound {
    /// Parse the CLI form: empty = silent, "default" = system sound
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            None | Some("") => Sound::Silent,
            Some("default") => Sound::Default,
            Some(other) => Sound::Named(other.to_string()),
        }
    }
}

/// Output encoding for the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Single `@EVENT` / value line
    #[default]
    Token,
    /// Pretty-printed JSON document
    Json,
}

/// Immutable description of one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    group_id: Option<String>,
    title: Option<String>,
    subtitle: Option<String>,
    message: String,
    interaction: Interaction,
    app_icon: Option<String>,
    content_image: Option<String>,
    sound: Sound,
    timeout: Option<Duration>,
    ignore_dnd: bool,
    output: OutputMode,
}

impl NotificationRequest {
    pub fn builder(message: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(message)
    }

    /// Reject requests that cannot be submitted
    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(AlertError::Validation("message is empty"));
        }
        Ok(())
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn app_icon(&self) -> Option<&str> {
        self.app_icon.as_deref()
    }

    pub fn content_image(&self) -> Option<&str> {
        self.content_image.as_deref()
    }

    pub fn sound(&self) -> &Sound {
        &self.sound
    }

    /// Auto-dismiss delay, `None` when no timeout is enforced
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn ignore_dnd(&self) -> bool {
        self.ignore_dnd
    }

    pub fn output(&self) -> OutputMode {
        self.output
    }
}

/// Builder for `NotificationRequest`
///
/// Empty strings passed to any optional setter mean "absent".
#[derive(Debug, Default)]
pub struct RequestBuilder {
    message: String,
    group_id: Option<String>,
    title: Option<String>,
    subtitle: Option<String>,
    reply: Option<String>,
    actions: Vec<String>,
    dropdown_label: Option<String>,
    close_label: Option<String>,
    app_icon: Option<String>,
    content_image: Option<String>,
    sound: Sound,
    timeout_secs: u64,
    ignore_dnd: bool,
    output: OutputMode,
}

fn non_empty(value: Option<impl Into<String>>) -> Option<String> {
    value.map(Into::into).filter(|s| !s.is_empty())
}

/// Split a comma-separated action list, dropping empty labels
pub fn parse_actions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl RequestBuilder {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn group_id(mut self, group_id: Option<impl Into<String>>) -> Self {
        self.group_id = non_empty(group_id);
        self
    }

    pub fn title(mut self, title: Option<impl Into<String>>) -> Self {
        self.title = non_empty(title);
        self
    }

    pub fn subtitle(mut self, subtitle: Option<impl Into<String>>) -> Self {
        self.subtitle = non_empty(subtitle);
        self
    }

    pub fn reply(mut self, placeholder: Option<impl Into<String>>) -> Self {
        self.reply = placeholder.map(Into::into);
        self
    }

    pub fn actions(mut self, labels: Vec<String>) -> Self {
        self.actions = labels;
        self
    }

    pub fn dropdown_label(mut self, label: Option<impl Into<String>>) -> Self {
        self.dropdown_label = non_empty(label);
        self
    }

    pub fn close_label(mut self, label: Option<impl Into<String>>) -> Self {
        self.close_label = non_empty(label);
        self
    }

    pub fn app_icon(mut self, icon: Option<impl Into<String>>) -> Self {
        self.app_icon = non_empty(icon);
        self
    }

    pub fn content_image(mut self, image: Option<impl Into<String>>) -> Self {
        self.content_image = non_empty(image);
        self
    }

    pub fn sound(mut self, sound: Sound) -> Self {
        self.sound = sound;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn ignore_dnd(mut self, ignore: bool) -> Self {
        self.ignore_dnd = ignore;
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Finish the request, resolving the interaction shape
    ///
    /// Actions take precedence over a reply placeholder.
    pub fn build(self) -> Result<NotificationRequest> {
        let interaction = if !self.actions.is_empty() {
            let many = self.actions.len() >= 2;
            Interaction::Actions {
                labels: self.actions,
                dropdown_label: self.dropdown_label.filter(|_| many),
                close_label: self.close_label.filter(|_| many),
            }
        } else if let Some(placeholder) = self.reply {
            Interaction::Reply { placeholder }
        } else {
            Interaction::Plain
        };

        let request = NotificationRequest {
            group_id: self.group_id,
            title: self.title,
            subtitle: self.subtitle,
            message: self.message,
            interaction,
            app_icon: self.app_icon,
            content_image: self.content_image,
            sound: self.sound,
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
            ignore_dnd: self.ignore_dnd,
            output: self.output,
        };
        request.validate()?;
        Ok(request)
    }
}
