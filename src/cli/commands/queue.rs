//! Queue management command implementation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::cli::args::{OutputFormat, QueueCommands};
use crate::error::ClassyncError;
use crate::features::sync::{QueueStore, QueuedRequest};
use crate::output::{format_requests, to_json};

/// Execute queue subcommands.
///
/// # Errors
///
/// Returns an error if the queue operation fails or the input is invalid.
pub fn queue(queue: &QueueStore, cmd: QueueCommands, format: OutputFormat) -> Result<String, ClassyncError> {
    match cmd {
        QueueCommands::Status => show_status(queue, format),
        QueueCommands::List => list_requests(queue, format),
        QueueCommands::Add {
            method,
            url,
            body,
            headers,
            temp_id,
        } => add_request(queue, &method, &url, body.as_deref(), &headers, temp_id, format),
        QueueCommands::Remove { id } => remove_request(queue, id, format),
        QueueCommands::Cancel { temp_id } => cancel_creation(queue, &temp_id, format),
        QueueCommands::Clear { force } => clear_queue(queue, force, format),
    }
}

/// Show queue status.
fn show_status(queue: &QueueStore, format: OutputFormat) -> Result<String, ClassyncError> {
    let stats = queue.stats()?;
    let oldest = stats.oldest_timestamp.and_then(DateTime::from_timestamp_millis);

    match format {
        OutputFormat::Json => {
            let data = serde_json::json!({
                "pending": stats.pending,
                "creations": stats.creations,
                "failing": stats.failing,
                "oldest_pending": oldest.map(|t| t.to_rfc3339()),
            });
            to_json(&data)
        }
        OutputFormat::Pretty => {
            let mut lines = Vec::new();

            lines.push("Request Queue Status".bold().to_string());
            lines.push("─".repeat(40));

            lines.push(format!(
                "  Pending:    {} {}",
                stats.pending,
                if stats.pending > 0 {
                    "requests waiting".dimmed()
                } else {
                    "".dimmed()
                }
            ));

            lines.push(format!(
                "  Creations:  {} {}",
                stats.creations,
                "offline-created classrooms".dimmed()
            ));

            lines.push(format!(
                "  Failing:    {} {}",
                stats.failing,
                if stats.failing > 0 {
                    "requests failed at least once".red()
                } else {
                    "".normal()
                }
            ));

            if let Some(oldest) = oldest {
                let age = Utc::now().signed_duration_since(oldest);
                let age_str = if age.num_hours() > 0 {
                    format!("{} hours ago", age.num_hours())
                } else if age.num_minutes() > 0 {
                    format!("{} minutes ago", age.num_minutes())
                } else {
                    "just now".to_string()
                };
                lines.push(format!("  Oldest:     {}", age_str.dimmed()));
            }

            if stats.pending > 0 {
                lines.push(String::new());
                lines.push(
                    "Run 'classync sync' to replay queued requests"
                        .dimmed()
                        .to_string(),
                );
            }

            Ok(lines.join("\n"))
        }
    }
}

/// List queued requests in the order a sync pass would replay them.
fn list_requests(queue: &QueueStore, format: OutputFormat) -> Result<String, ClassyncError> {
    let mut requests = queue.get_all()?;
    requests.sort_by_key(|r| r.timestamp);
    format_requests(&requests, format)
}

fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>, ClassyncError> {
    raw.iter()
        .map(|h| {
            let (name, value) = h.split_once(':').ok_or_else(|| {
                ClassyncError::InvalidInput(format!("header must be NAME:VALUE, got {h:?}"))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ClassyncError::InvalidInput(format!("empty header name in {h:?}")));
            }
            Ok((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Queue a request directly.
fn add_request(
    queue: &QueueStore,
    method: &str,
    url: &str,
    body: Option<&str>,
    headers: &[String],
    temp_id: Option<String>,
    format: OutputFormat,
) -> Result<String, ClassyncError> {
    if url.trim().is_empty() {
        return Err(ClassyncError::InvalidInput("URL must not be empty".to_string()));
    }

    let body = body
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .map_err(|e| ClassyncError::InvalidInput(format!("body is not valid JSON: {e}")))?;
    let headers = parse_headers(headers)?;

    let mut request = QueuedRequest::new(url, method.to_uppercase(), body, headers, temp_id);
    request.id = Some(queue.add(&request)?);

    match format {
        OutputFormat::Json => to_json(&request),
        OutputFormat::Pretty => Ok(format!(
            "Queued {} {} (ID: {})",
            request.method,
            request.url,
            request.id.unwrap_or(0)
        )),
    }
}

/// Remove one request.
fn remove_request(queue: &QueueStore, id: i64, format: OutputFormat) -> Result<String, ClassyncError> {
    if !queue.delete_by_id(id)? {
        return Err(ClassyncError::NotFound(format!("Queued request {id}")));
    }

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({"removed": id})),
        OutputFormat::Pretty => Ok(format!("Removed queued request {id}")),
    }
}

/// Withdraw a queued creation.
fn cancel_creation(queue: &QueueStore, temp_id: &str, format: OutputFormat) -> Result<String, ClassyncError> {
    let removed = queue.delete_by_temp_id(temp_id)?;

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({"temp_id": temp_id, "removed": removed})),
        OutputFormat::Pretty => {
            if removed == 0 {
                Ok(format!("Nothing queued under {temp_id}"))
            } else {
                Ok(format!("Cancelled queued creation {temp_id}"))
            }
        }
    }
}

/// Remove everything.
fn clear_queue(queue: &QueueStore, force: bool, format: OutputFormat) -> Result<String, ClassyncError> {
    if !force {
        return Err(ClassyncError::InvalidInput(
            "Use --force to discard all queued requests".to_string(),
        ));
    }

    let count = queue.clear()?;

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({"cleared": count})),
        OutputFormat::Pretty => Ok(format!("Cleared {count} queued requests")),
    }
}
