//! Classroom command implementation.

use colored::Colorize;

use super::Session;
use crate::cli::args::{ClassroomCommands, OutputFormat};
use crate::error::ClassyncError;
use crate::features::classroom::{ClassroomService, CreateClassroom, Delivery};
use crate::output::{format_classroom, format_classrooms, to_json};

/// Execute classroom subcommands.
///
/// # Errors
///
/// Returns an error if there is no token, the server rejects the call, or
/// an offline write cannot be queued.
pub fn classroom(
    session: &Session,
    cmd: ClassroomCommands,
    format: OutputFormat,
) -> Result<String, ClassyncError> {
    let service = ClassroomService::new(&session.sync, session.config.api.token());

    match cmd {
        ClassroomCommands::List => format_classrooms(&service.list_classrooms()?, format),
        ClassroomCommands::Add {
            grade,
            section,
            subject,
        } => {
            let classroom = service.add_classroom(CreateClassroom {
                grade,
                section,
                subject,
            })?;
            format_classroom(&classroom, format)
        }
        ClassroomCommands::Delete { id } => {
            let delivery = service.delete_classroom(&id)?;
            format_delivery(delivery, &format!("Deleted classroom {id}"), format)
        }
        ClassroomCommands::Progress { id, chapters } => {
            let delivery = service.update_progress(&id, &chapters)?;
            format_delivery(
                delivery,
                &format!("Updated progress of {id}: {} chapters", chapters.len()),
                format,
            )
        }
    }
}

fn format_delivery(
    delivery: Delivery,
    done: &str,
    format: OutputFormat,
) -> Result<String, ClassyncError> {
    let status = match delivery {
        Delivery::Sent => "sent",
        Delivery::Queued => "queued",
        Delivery::Cancelled => "cancelled",
    };

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({"status": status})),
        OutputFormat::Pretty => Ok(match delivery {
            Delivery::Sent => done.to_string(),
            Delivery::Queued => format!("{} {done} (queued; will sync when online)", "⏳".yellow()),
            Delivery::Cancelled => "Cancelled queued creation".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_delivery() {
        let json = format_delivery(Delivery::Queued, "Deleted classroom 1", OutputFormat::Json).unwrap();
        assert!(json.contains("\"queued\""));

        let pretty = format_delivery(Delivery::Sent, "Deleted classroom 1", OutputFormat::Pretty).unwrap();
        assert_eq!(pretty, "Deleted classroom 1");
    }
}
