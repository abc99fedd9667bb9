//! Output formatting for classync.
//!
//! This module provides formatters for displaying classrooms and queued
//! requests in various formats.

mod json;
mod pretty;

use crate::cli::args::OutputFormat;
use crate::error::ClassyncError;
use crate::features::classroom::Classroom;
use crate::features::sync::QueuedRequest;

pub use json::*;
pub use pretty::*;

/// Format classrooms based on output format
///
/// # Errors
///
/// Returns `ClassyncError::Parse` if JSON serialization fails.
pub fn format_classrooms(
    classrooms: &[Classroom],
    format: OutputFormat,
) -> Result<String, ClassyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_classrooms_pretty(classrooms)),
        OutputFormat::Json => format_classrooms_json(classrooms),
    }
}

/// Format a single classroom based on output format
///
/// # Errors
///
/// Returns `ClassyncError::Parse` if JSON serialization fails.
pub fn format_classroom(classroom: &Classroom, format: OutputFormat) -> Result<String, ClassyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_classroom_pretty(classroom)),
        OutputFormat::Json => to_json(classroom),
    }
}

/// Format queued requests based on output format
///
/// # Errors
///
/// Returns `ClassyncError::Parse` if JSON serialization fails.
pub fn format_requests(
    requests: &[QueuedRequest],
    format: OutputFormat,
) -> Result<String, ClassyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_requests_pretty(requests)),
        OutputFormat::Json => format_requests_json(requests),
    }
}
