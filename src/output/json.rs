//! JSON output formatting for classync.

use serde::Serialize;
use serde_json::json;

use crate::error::ClassyncError;
use crate::features::classroom::Classroom;
use crate::features::sync::QueuedRequest;

/// Format classrooms as JSON
///
/// # Errors
///
/// Returns `ClassyncError::Parse` if JSON serialization fails.
pub fn format_classrooms_json(classrooms: &[Classroom]) -> Result<String, ClassyncError> {
    let output = json!({
        "count": classrooms.len(),
        "items": classrooms
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format queued requests as JSON
///
/// # Errors
///
/// Returns `ClassyncError::Parse` if JSON serialization fails.
pub fn format_requests_json(requests: &[QueuedRequest]) -> Result<String, ClassyncError> {
    let output = json!({
        "count": requests.len(),
        "items": requests
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Serialize any value as pretty JSON
///
/// # Errors
///
/// Returns `ClassyncError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, ClassyncError> {
    Ok(serde_json::to_string_pretty(value)?)
}
