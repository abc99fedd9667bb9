use chrono::Utc;
use colored::Colorize;

use crate::features::classroom::Classroom;
use crate::features::sync::QueuedRequest;

/// Format a list of classrooms as a pretty table
pub fn format_classrooms_pretty(classrooms: &[Classroom]) -> String {
    if classrooms.is_empty() {
        return "Classrooms (0 items)\n  No classrooms".to_string();
    }

    let mut output = format!("Classrooms ({} items)\n", classrooms.len());
    output.push_str(&"─".repeat(60));
    output.push('\n');

    for classroom in classrooms {
        output.push_str(&classroom_line(classroom));
        output.push('\n');
    }

    output
}

/// Format a single classroom as pretty output
pub fn format_classroom_pretty(classroom: &Classroom) -> String {
    let mut output = classroom_line(classroom);
    output.push('\n');
    output.push_str(&format!("  {}: {}\n", "ID".dimmed(), classroom.id));
    if classroom.is_pending() {
        output.push_str(&format!(
            "  {}\n",
            "Queued offline; will be created on next sync".yellow()
        ));
    }
    output
}

fn classroom_line(classroom: &Classroom) -> String {
    let marker = if classroom.is_pending() {
        "[~]".yellow()
    } else {
        "[ ]".white()
    };

    let mut line = format!(
        "{} {}  {}",
        marker,
        classroom.subject.bold(),
        format!("Grade {} {}", classroom.grade, classroom.section).dimmed()
    );

    if !classroom.completed_chapters.is_empty() {
        line.push_str(&format!(
            "  {}",
            format!("{} chapters done", classroom.completed_chapters.len()).green()
        ));
    }

    line
}

/// Format queued requests as a pretty table
pub fn format_requests_pretty(requests: &[QueuedRequest]) -> String {
    if requests.is_empty() {
        return "Queued requests (0 items)\n  Nothing waiting to sync".to_string();
    }

    let mut output = format!("Queued requests ({} items)\n", requests.len());
    output.push_str(&"─".repeat(60));
    output.push('\n');

    for req in requests {
        let id = req.id.map_or_else(|| "?".to_string(), |id| id.to_string());
        let mut line = format!(
            "{:>4} {:<6} {}",
            id.dimmed(),
            req.method.cyan(),
            req.url
        );

        if let Some(temp_id) = &req.temp_id {
            line.push_str(&format!("  {}", temp_id.yellow()));
        }

        if let Some(created) = req.created_at() {
            line.push_str(&format!("  {}", age(created).dimmed()));
        }

        if req.attempts > 0 {
            line.push_str(&format!(
                "  {}",
                format!("{} failed attempts", req.attempts).red()
            ));
        }

        output.push_str(&line);
        output.push('\n');
    }

    output
}

fn age(created: chrono::DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(created);
    if age.num_days() > 0 {
        format!("{} days ago", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{} hours ago", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{} minutes ago", age.num_minutes())
    } else {
        "just now".to_string()
    }
}
