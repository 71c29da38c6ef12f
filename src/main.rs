// Clippy configuration: enable pedantic but allow overly strict lints
#![allow(clippy::missing_errors_doc)] // Internal functions don't need # Errors docs
#![allow(clippy::missing_panics_doc)] // Internal functions don't need # Panics docs
#![allow(clippy::must_use_candidate)] // Not all getters need #[must_use]
#![allow(clippy::module_name_repetitions)] // e.g., ServiceError in service module is fine
#![allow(clippy::doc_markdown)] // Don't require backticks around JSON, DnD, etc.
#![allow(clippy::struct_excessive_bools)] // CLI structs can have multiple bool fields
#![allow(clippy::significant_drop_tightening)] // Lock guard drops are intentional
#![allow(clippy::redundant_closure_for_method_calls)] // Sometimes closures are clearer
#![allow(clippy::needless_pass_by_value)] // PathBuf by value is fine for config loading

//! alerter - send a desktop notification and wait for the user's response
//!
//! Delivers one notification, blocks until it is clicked, answered,
//! closed or timed out, then prints what happened as a single token
//! (`@CLOSED`, an action label, reply text...) or a JSON document.
//!
//! Usage:
//!   alerter -message "Deploy now?" -actions "Yes,No"
//!   echo "Build complete" | alerter -json
//!   alerter -list ALL

mod cancel;
mod cli;
mod config;
mod coordinator;
mod errors;
mod outcome;
mod output;
mod registry;
mod request;
mod service;

use cancel::CancellationBridge;
use cli::Cli;
use color_eyre::Result;
use config::AlerterConfig;
use coordinator::DeliveryCoordinator;
use errors::AlertError;
use errors::ServiceError;
use registry::GroupRegistry;
use service::NotificationService;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Get the log directory path
fn get_log_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("/tmp/alerter/logs"),
        |dirs| dirs.cache_dir().join("alerter").join("logs"),
    )
}

/// File logging with daily rotation
///
/// stdout carries the result and stderr the diagnostics, so logs only go
/// to the file. Returns `None` (no logging) if the directory is unusable.
fn init_logging(level: &str) -> Option<WorkerGuard> {
    let log_dir = get_log_dir();
    std::fs::create_dir_all(&log_dir).ok()?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("alerter")
        .filename_suffix("log")
        .build(&log_dir)
        .ok()?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let log_filter = format!("alerter={level}");
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&log_filter))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .try_init()
        .ok()?;
    Some(guard)
}

/// Exit status for success
const EXIT_OK: u8 = 0;

/// Exit status for every failure, including a cancelled delivery
const EXIT_FAILURE: u8 = 1;

/// Run one invocation; the returned code is the process exit status
///
/// `service` is the outcome of connecting to the platform server and
/// `piped` supplies the stdin message when no `-message` is given.
async fn run(
    cli: &Cli,
    config: &AlerterConfig,
    service: std::result::Result<Arc<dyn NotificationService>, ServiceError>,
    bridge: CancellationBridge,
    piped: impl FnOnce() -> io::Result<Option<String>>,
    out: &mut impl Write,
) -> errors::Result<u8> {
    let sender = cli.sender(&config.defaults);
    let service = service.map_err(AlertError::Initialization)?;
    service.ensure_ready(&sender).map_err(AlertError::Initialization)?;
    tracing::debug!(%sender, "Notification service ready");

    let registry = GroupRegistry::new(service.clone());

    if let Some(group) = cli.list.as_deref() {
        out.write_all(output::listing(&registry.list(group)?)?.as_bytes())?;
        return Ok(EXIT_OK);
    }

    if let Some(group) = cli.remove.as_deref() {
        registry.remove(group)?;
        if cli.message.is_none() {
            return Ok(EXIT_OK);
        }
    }

    let message = match cli.message.clone().filter(|m| !m.trim().is_empty()) {
        Some(message) => Some(message),
        None => piped()?,
    };
    let Some(message) = message else {
        cli::write_help(out)?;
        return Ok(EXIT_FAILURE);
    };

    let request = cli.request(message, &config.defaults)?;
    let coordinator = DeliveryCoordinator::new(service, sender, bridge);
    let activation = coordinator.deliver(&request).await?;

    writeln!(out, "{}", output::render(&activation, request.output())?)?;
    Ok(EXIT_OK)
}

/// Report a failed run on stderr and pick the exit status
fn exit_status(result: errors::Result<u8>) -> u8 {
    match result {
        Ok(code) => code,
        Err(e) if e.is_silent() => EXIT_FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "alerter failed");
            eprintln!("[!] {e}");
            if matches!(e, AlertError::Initialization(_)) {
                eprintln!("[!] Make sure a notification server is running");
            }
            EXIT_FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let cli = cli::parse();

    if let Some(shell) = cli.completions {
        cli::print_completions(shell);
        return Ok(ExitCode::SUCCESS);
    }

    // Initialize error handling
    color_eyre::install()?;

    let _log_guard = init_logging(&cli.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "alerter starting");

    let config = cli
        .config
        .clone()
        .map_or_else(AlerterConfig::load, AlerterConfig::load_from_path);

    let bridge = CancellationBridge::new();
    let _signals = bridge.install();

    let service = service::connect(config.ledger_path());
    let mut stdout = io::stdout();
    let result = run(&cli, &config, service, bridge, cli::piped_message, &mut stdout).await;
    stdout.flush()?;

    Ok(ExitCode::from(exit_status(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::RawPayload;
    use crate::service::memory::{Behavior, MemoryService};
    use clap::Parser;
    use std::ffi::OsString;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Cli {
        let argv = std::iter::once("alerter")
            .chain(args.iter().copied())
            .map(OsString::from);
        Cli::try_parse_from(cli::normalize_args(argv)).unwrap()
    }

    async fn invoke(
        args: &[&str],
        service: &Arc<MemoryService>,
        piped: Option<&str>,
    ) -> (errors::Result<u8>, String) {
        let piped = piped.map(String::from);
        let service: Arc<dyn NotificationService> = service.clone();
        let mut out = Vec::new();
        let result = run(
            &parse(args),
            &AlerterConfig::default(),
            Ok(service),
            CancellationBridge::new(),
            move || Ok(piped),
            &mut out,
        )
        .await;
        (result, String::from_utf8(out).unwrap())
    }

    fn responding(payload: RawPayload) -> Arc<MemoryService> {
        Arc::new(MemoryService::new(Behavior::Respond {
            payload,
            after: Duration::from_millis(10),
        }))
    }

    #[tokio::test]
    async fn test_connect_failure_exits_one() {
        let mut out = Vec::new();
        let result = run(
            &parse(&["-message", "Ping"]),
            &AlerterConfig::default(),
            Err(ServiceError::Unavailable("no session bus".into())),
            CancellationBridge::new(),
            || Ok(None),
            &mut out,
        )
        .await;
        assert!(matches!(result, Err(AlertError::Initialization(_))));
        assert_eq!(exit_status(result), EXIT_FAILURE);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_unready_service_is_initialization_error() {
        let service = Arc::new(MemoryService::unavailable());
        let (result, out) = invoke(&["-message", "Ping"], &service, None).await;
        assert!(matches!(
            result,
            Err(AlertError::Initialization(ServiceError::Unavailable(_)))
        ));
        assert!(out.is_empty());
        assert_eq!(service.submitted(), 0);
    }

    #[tokio::test]
    async fn test_remove_then_deliver() {
        let service = responding(RawPayload::closed());
        let old = service.seed(Some("build"), "Old build");
        let (result, out) =
            invoke(&["-remove", "build", "-message", "Deploy?"], &service, None).await;

        assert_eq!(result.unwrap(), EXIT_OK);
        assert_eq!(out, "@CLOSED\n");
        assert_eq!(service.submitted(), 1);
        assert!(service.delivered().unwrap().iter().all(|n| n.id != old.0));
    }

    #[tokio::test]
    async fn test_remove_alone_does_not_deliver() {
        let service = Arc::new(MemoryService::new(Behavior::Silent));
        service.seed(Some("build"), "Old build");
        service.seed(Some("deploy"), "Deploy");
        let (result, out) = invoke(&["-remove", "build"], &service, None).await;

        assert_eq!(result.unwrap(), EXIT_OK);
        assert!(out.is_empty());
        assert_eq!(service.submitted(), 0);
        assert_eq!(service.delivered().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_to_do_prints_help() {
        let service = Arc::new(MemoryService::new(Behavior::Silent));
        let (result, out) = invoke(&[], &service, None).await;

        assert_eq!(result.unwrap(), EXIT_FAILURE);
        assert!(out.contains("Usage"));
        assert!(out.contains("@CONTENTCLICKED"));
        assert_eq!(service.submitted(), 0);
    }

    #[tokio::test]
    async fn test_piped_message_is_delivered() {
        let service = responding(RawPayload::content_clicked());
        let (result, out) = invoke(&["-json"], &service, Some("Build complete")).await;

        assert_eq!(result.unwrap(), EXIT_OK);
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["event"], "contentClicked");
        assert_eq!(service.submitted(), 1);
    }

    #[tokio::test]
    async fn test_list_empty_prints_nothing() {
        let service = Arc::new(MemoryService::new(Behavior::Silent));
        let (result, out) = invoke(&["-list", "ALL"], &service, None).await;
        assert_eq!(result.unwrap(), EXIT_OK);
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn test_list_prints_one_line_per_notification() {
        let service = Arc::new(MemoryService::new(Behavior::Silent));
        service.seed(Some("build"), "one");
        service.seed(Some("deploy"), "two");
        let (result, out) = invoke(&["-list", "build", "-message", "ignored"], &service, None).await;

        assert_eq!(result.unwrap(), EXIT_OK);
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("\"groupId\":\"build\""));
        assert_eq!(service.submitted(), 0);
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(Ok(EXIT_OK)), 0);
        assert_eq!(exit_status(Err(AlertError::Cancelled)), 1);
        assert_eq!(
            exit_status(Err(AlertError::Submission(ServiceError::Rejected(
                "reply unsupported".into()
            )))),
            1
        );
    }
}
