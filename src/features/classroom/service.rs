use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::ClassyncError;
use crate::features::classroom::types::{Classroom, CreateClassroom};
use crate::features::sync::{is_temp_id, new_temp_id, OfflineSync, WriteOutcome};
use crate::transport::{ReplayRequest, ReplayResponse, Transport};

/// Collection endpoint for classrooms.
pub const SUBJECTS_PATH: &str = "/api/dashboard/subjects";

/// How a mutation was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by the server.
    Sent,
    /// Queued for replay.
    Queued,
    /// A never-synced creation was withdrawn from the queue.
    Cancelled,
}

/// Classroom operations against the dashboard API.
pub struct ClassroomService<'a, T: Transport + 'static> {
    sync: &'a OfflineSync<T>,
    token: Option<String>,
}

impl<'a, T: Transport + 'static> ClassroomService<'a, T> {
    pub fn new(sync: &'a OfflineSync<T>, token: Option<String>) -> Self {
        ClassroomService { sync, token }
    }

    /// Headers every call carries. Queued requests keep this exact set.
    fn headers(&self) -> Result<BTreeMap<String, String>, ClassyncError> {
        let token = self
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClassyncError::Unauthorized("no token found".to_string()))?;

        Ok(BTreeMap::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), format!("Bearer {token}")),
        ]))
    }

    /// Fetch all classrooms. Reads are never queued.
    ///
    /// An empty or unparseable body yields an empty list.
    pub fn list_classrooms(&self) -> Result<Vec<Classroom>, ClassyncError> {
        let request = ReplayRequest::new("GET", SUBJECTS_PATH).with_headers(self.headers()?);
        let response = check(self.sync.transport().send(&request)?, "fetch classrooms")?;

        if response.body.trim().is_empty() {
            return Ok(Vec::new());
        }

        match response.json() {
            Ok(classrooms) => Ok(classrooms),
            Err(e) => {
                warn!("failed to parse classrooms JSON: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// Create a classroom.
    ///
    /// Offline, the creation is queued under a fresh temp id and an
    /// optimistic classroom carrying that id is returned.
    pub fn add_classroom(&self, data: CreateClassroom) -> Result<Classroom, ClassyncError> {
        let request = ReplayRequest::new("POST", SUBJECTS_PATH)
            .with_headers(self.headers()?)
            .with_body(serde_json::to_value(&data)?);
        let temp_id = new_temp_id();

        match self.sync.send_or_enqueue(request, Some(temp_id.clone()))? {
            WriteOutcome::Sent(response) => Ok(check(response, "add classroom")?.json()?),
            WriteOutcome::Queued { .. } => {
                info!(temp_id = %temp_id, "offline: queued classroom creation");
                Ok(Classroom::pending(temp_id, data))
            }
        }
    }

    /// Delete a classroom.
    ///
    /// A temp id means the classroom only exists in the queue, so its queued
    /// creation is withdrawn instead and the network is not touched.
    pub fn delete_classroom(&self, id: &str) -> Result<Delivery, ClassyncError> {
        if is_temp_id(id) {
            self.sync.cancel_queued_by_temp_id(id)?;
            return Ok(Delivery::Cancelled);
        }

        let request = ReplayRequest::new("DELETE", subject_url(id, "")?)
            .with_headers(self.headers()?)
            .with_body(serde_json::json!({}));

        self.deliver(request, "delete classroom")
    }

    /// Replace the completed chapter list of a classroom.
    ///
    /// `id` may be a temp id; the queued URL is rewritten once the creation
    /// syncs.
    pub fn update_progress(&self, id: &str, chapters: &[u32]) -> Result<Delivery, ClassyncError> {
        let request = ReplayRequest::new("POST", subject_url(id, "/progress")?)
            .with_headers(self.headers()?)
            .with_body(serde_json::to_value(chapters)?);

        self.deliver(request, "update progress")
    }

    fn deliver(&self, request: ReplayRequest, action: &str) -> Result<Delivery, ClassyncError> {
        match self.sync.send_or_enqueue(request, None)? {
            WriteOutcome::Sent(response) => {
                check(response, action)?;
                Ok(Delivery::Sent)
            }
            WriteOutcome::Queued { .. } => {
                info!("offline: queued {action}");
                Ok(Delivery::Queued)
            }
        }
    }
}

fn subject_url(id: &str, suffix: &str) -> Result<String, ClassyncError> {
    if id.is_empty() || id.contains('/') {
        return Err(ClassyncError::InvalidInput(format!("invalid classroom id: {id:?}")));
    }
    Ok(format!("{SUBJECTS_PATH}/{id}{suffix}"))
}

/// Map a non-2xx answer onto the error callers see.
fn check(response: ReplayResponse, action: &str) -> Result<ReplayResponse, ClassyncError> {
    if response.is_success() {
        return Ok(response);
    }
    if response.status == 401 {
        return Err(ClassyncError::Unauthorized("server refused credentials".to_string()));
    }

    let detail = response.body.trim();
    let message = if detail.is_empty() {
        format!("failed to {action}")
    } else {
        format!("failed to {action}: {detail}")
    };
    Err(ClassyncError::Rejected {
        status: response.status,
        message,
    })
}
