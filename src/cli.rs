//! CLI argument parsing
//!
//! Uses clap for argument parsing with derive macros. Flags are accepted
//! in the single-dash long form (`-message`, `-ignoreDnD`) that existing
//! scripts use, as well as the usual `--message`.

use crate::config::DefaultsConfig;
use crate::errors::Result;
use crate::request::{
    parse_actions, NotificationRequest, OutputMode, SenderIdentity, Sound, DEFAULT_SENDER,
    DEFAULT_TITLE,
};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use std::collections::HashSet;
use std::ffi::OsString;
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;

const EVENT_HELP: &str = "\
Event outputs (non-JSON mode):
  @TIMEOUT           Notification timed out
  @CLOSED            Notification closed by user
  @CONTENTCLICKED    Notification content clicked
  @ACTIONCLICKED     Default action clicked
  <action-value>     Specific action button clicked
  <reply-text>       Text entered in a reply notification

Examples:
  alerter -message \"Hello, World!\"
  echo \"Build complete\" | alerter -sound default
  alerter -message \"Deploy now?\" -actions \"Yes,No,Later\" -title \"Deployment\"
  alerter -reply \"release name\" -message \"Enter release name:\"
  alerter -list ALL";

/// Send a desktop notification and wait for the user's response
#[derive(Parser, Debug, Default)]
#[command(name = "alerter")]
#[command(author, version, about, long_about = None)]
#[command(after_help = EVENT_HELP)]
pub struct Cli {
    /// The notification message body (or pipe data to stdin)
    #[arg(long, allow_hyphen_values = true)]
    pub message: Option<String>,

    /// Remove notifications with the specified group ID ('ALL' for all)
    #[arg(long, value_name = "ID")]
    pub remove: Option<String>,

    /// List notifications for the group ID ('ALL' for all)
    #[arg(long, value_name = "ID")]
    pub list: Option<String>,

    /// Notification title (default: "Terminal")
    #[arg(long)]
    pub title: Option<String>,

    /// Notification subtitle
    #[arg(long)]
    pub subtitle: Option<String>,

    /// Display as reply type alert, VALUE is placeholder text
    #[arg(long, value_name = "VALUE", num_args = 0..=1, default_missing_value = "Reply")]
    pub reply: Option<String>,

    /// Comma-separated action button titles (several create a dropdown)
    #[arg(long, value_name = "VALUE1,VALUE2,...")]
    pub actions: Option<String>,

    /// Label for the actions dropdown (with several actions)
    #[arg(long = "dropdownLabel", alias = "dropdown-label")]
    pub dropdown_label: Option<String>,

    /// Label for the close button (with several actions)
    #[arg(long = "closeLabel", alias = "close-label")]
    pub close_label: Option<String>,

    /// URL or path to app icon image
    #[arg(long = "appIcon", alias = "app-icon", value_name = "URL")]
    pub app_icon: Option<String>,

    /// URL or path to content image
    #[arg(long = "contentImage", alias = "content-image", value_name = "URL")]
    pub content_image: Option<String>,

    /// Sound name (use 'default' for the system sound)
    #[arg(long, value_name = "NAME")]
    pub sound: Option<String>,

    /// Auto-close the notification after NUMBER seconds
    #[arg(long, value_name = "NUMBER")]
    pub timeout: Option<u64>,

    /// Group ID for notification management
    #[arg(long, value_name = "ID")]
    pub group: Option<String>,

    /// Sender identity (default: com.apple.Terminal)
    #[arg(long, env = "ALERTER_SENDER", value_name = "ID")]
    pub sender: Option<String>,

    /// Send notification even if Do Not Disturb is enabled
    #[arg(long = "ignoreDnD", alias = "ignore-dnd", default_value_t = false)]
    pub ignore_dnd: bool,

    /// Output result as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Configuration file (default: ~/.config/alerter/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Generate shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,
}

/// Long flag names clap knows about, aliases included, and which of
/// them always consume the following token as their value
fn long_names() -> (HashSet<String>, HashSet<String>) {
    let cmd = Cli::command();
    let mut names: HashSet<String> = ["help", "version"].iter().map(|s| s.to_string()).collect();
    let mut with_value = HashSet::new();
    for arg in cmd.get_arguments() {
        let mut spellings: Vec<&str> = arg.get_all_aliases().unwrap_or_default();
        spellings.extend(arg.get_long());
        let takes_value = arg.get_action().takes_values()
            && arg.get_num_args().map_or(true, |range| range.min_values() > 0);
        for name in spellings {
            names.insert(name.to_string());
            if takes_value {
                with_value.insert(name.to_string());
            }
        }
    }
    (names, with_value)
}

/// Rewrite `-name` / `-name=value` to `--name` for known long flags
///
/// The token after a flag that takes a value is left alone, so a message
/// spelled like a flag stays a message.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let (longs, with_value) = long_names();
    let mut passthrough = false;
    let mut value_next = false;
    args.into_iter()
        .enumerate()
        .map(|(idx, arg)| {
            if idx == 0 || passthrough {
                return arg;
            }
            if std::mem::take(&mut value_next) {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            let Some(rest) = text.strip_prefix("--").or_else(|| text.strip_prefix('-')) else {
                return arg;
            };
            let (name, inline_value) = match rest.split_once('=') {
                Some((name, _)) => (name, true),
                None => (rest, false),
            };
            if !longs.contains(name) {
                return arg;
            }
            value_next = !inline_value && with_value.contains(name);
            if text.starts_with("--") {
                arg
            } else {
                OsString::from(format!("-{text}"))
            }
        })
        .collect()
}

/// Parse the process arguments
pub fn parse() -> Cli {
    Cli::parse_from(normalize_args(std::env::args_os()))
}

/// Write the help text to `out`
pub fn write_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", Cli::command().render_help())
}

/// Generate shell completions and print to stdout
pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "alerter", &mut io::stdout());
}

/// Read a message from `reader`, trimmed; empty input yields `None`
pub fn message_from_reader(mut reader: impl Read) -> io::Result<Option<String>> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    let trimmed = buf.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// Message piped on stdin, if stdin is not a terminal
pub fn piped_message() -> io::Result<Option<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    message_from_reader(stdin.lock())
}

impl Cli {
    /// Sender identity: flag/env, then config, then the built-in default
    pub fn sender(&self, defaults: &DefaultsConfig) -> SenderIdentity {
        SenderIdentity::new(
            self.sender
                .clone()
                .or_else(|| defaults.sender.clone())
                .unwrap_or_else(|| DEFAULT_SENDER.to_string()),
        )
    }

    /// Build the request for `message`, filling gaps from the config
    pub fn request(&self, message: String, defaults: &DefaultsConfig) -> Result<NotificationRequest> {
        let title = self
            .title
            .clone()
            .or_else(|| defaults.title.clone())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let sound = self.sound.as_deref().or(defaults.sound.as_deref());
        let output = if self.json || defaults.json {
            OutputMode::Json
        } else {
            OutputMode::Token
        };

        NotificationRequest::builder(message)
            .title(Some(title))
            .subtitle(self.subtitle.clone())
            .group_id(self.group.clone())
            .reply(self.reply.clone())
            .actions(self.actions.as_deref().map(parse_actions).unwrap_or_default())
            .dropdown_label(self.dropdown_label.clone())
            .close_label(self.close_label.clone())
            .app_icon(self.app_icon.clone())
            .content_image(self.content_image.clone())
            .sound(Sound::parse(sound))
            .timeout_secs(self.timeout.unwrap_or(defaults.timeout))
            .ignore_dnd(self.ignore_dnd)
            .output(output)
            .build()
    }
}
