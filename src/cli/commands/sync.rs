//! Sync and watch command implementation.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use colored::Colorize;

use super::Session;
use crate::cli::args::OutputFormat;
use crate::error::ClassyncError;
use crate::features::sync::{format_sync_report, StatusEvent, SyncOutcome, SyncReport};
use crate::output::to_json;

/// Run one sync pass.
///
/// # Errors
///
/// Returns an error if the queue cannot be read.
pub fn sync(session: &Session, format: OutputFormat) -> Result<String, ClassyncError> {
    match session.sync.sync_now()? {
        SyncOutcome::AlreadyRunning => match format {
            OutputFormat::Json => to_json(&serde_json::json!({"status": "already_running"})),
            OutputFormat::Pretty => Ok("A sync pass is already running.".to_string()),
        },
        SyncOutcome::Completed(report) => match format {
            OutputFormat::Json => to_json(&report_json(&report)),
            OutputFormat::Pretty => {
                if report.total() == 0 {
                    Ok("No queued requests to sync.".to_string())
                } else {
                    Ok(format_sync_report(&report))
                }
            }
        },
    }
}

fn report_json(report: &SyncReport) -> serde_json::Value {
    serde_json::json!({
        "replayed": report.replayed,
        "failed": report.failed,
        "discarded": report.discarded,
        "skipped": report.skipped,
        "rewritten": report.rewritten,
        "rewrite_failures": report.rewrite_failures,
        "total": report.total(),
    })
}

/// Render one status event as a line.
fn format_event(event: &StatusEvent, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let value = match event {
                StatusEvent::Online => serde_json::json!({"event": "online"}),
                StatusEvent::Offline => serde_json::json!({"event": "offline"}),
                StatusEvent::SyncStarted => serde_json::json!({"event": "sync_started"}),
                StatusEvent::SyncFinished(report) => {
                    serde_json::json!({"event": "sync_finished", "report": report_json(report)})
                }
            };
            value.to_string()
        }
        OutputFormat::Pretty => match event {
            StatusEvent::Online => format!("{} online", "●".green()),
            StatusEvent::Offline => format!("{} offline; writes will be queued", "●".red()),
            StatusEvent::SyncStarted => format!("{} syncing...", "↻".cyan()),
            StatusEvent::SyncFinished(report) => format!(
                "{} sync finished: {} replayed, {} still queued",
                "✓".green(),
                report.replayed,
                report.failed
            ),
        },
    }
}

/// Watch connectivity, syncing on every reconnect.
///
/// The loop has no exit of its own; it ends with the process.
///
/// If the API is already reachable at start, one pass runs immediately so
/// requests queued by earlier commands are not left waiting for a
/// disconnect.
///
/// # Errors
///
/// Returns an error if the initial pass cannot read the queue.
pub fn watch(
    session: &Session,
    interval: Option<u64>,
    format: OutputFormat,
) -> Result<String, ClassyncError> {
    let interval = interval.map_or_else(|| session.config.sync.probe_interval(), Duration::from_secs);

    let _listener = session
        .sync
        .subscribe(move |event| println!("{}", format_event(event, format)));

    let initial = format_event(
        if session.sync.is_online() {
            &StatusEvent::Online
        } else {
            &StatusEvent::Offline
        },
        format,
    );
    println!("{initial}");

    if session.sync.is_online() {
        session.sync.sync_now()?;
    }

    let never = AtomicBool::new(false);
    session.sync.monitor().watch(&session.probe, interval, &never);

    Ok(String::new())
}
