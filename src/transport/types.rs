//! Requests, responses and transport errors.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to get any response out of the server.
///
/// The transport decides which failures mean "the network is not there";
/// callers never inspect messages to find out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Could not reach the server (refused, DNS, timeout, no route).
    #[error("network unreachable: {0}")]
    Connectivity(String),
    /// The request itself could not be built or sent.
    #[error("request failed: {0}")]
    Request(String),
    /// The response arrived but its body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl TransportError {
    /// Whether the server could not be reached at all.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

/// One HTTP request, as replayed from the queue or sent by a write path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRequest {
    /// Absolute URL or path relative to the API base URL.
    pub url: String,
    /// HTTP verb.
    pub method: String,
    /// Headers sent verbatim.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// JSON payload, if any.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl ReplayRequest {
    /// A request with no headers and no body.
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        ReplayRequest {
            url: url.into(),
            method: method.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialized payload. Present bodies are always sent as JSON,
    /// whatever the method.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn payload(&self) -> Result<Option<Vec<u8>>, TransportError> {
        self.body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| TransportError::Request(format!("unserializable body: {e}")))
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body text; empty when the server sent none.
    pub body: String,
}

impl ReplayResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        ReplayResponse {
            status,
            body: body.into(),
        }
    }

    /// 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    /// 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.status, 400..=499)
    }

    /// Parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Server-assigned identifier in a JSON object body, if any.
    ///
    /// Numeric ids are rendered as their decimal text so they can be spliced
    /// into URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not JSON.
    pub fn assigned_id(&self) -> Result<Option<String>, serde_json::Error> {
        let value: serde_json::Value = self.json()?;
        Ok(match value.get("id") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_serializes_any_method() {
        let delete = ReplayRequest::new("DELETE", "/api/dashboard/subjects/1").with_body(json!({}));
        assert_eq!(delete.payload().unwrap(), Some(b"{}".to_vec()));

        let progress =
            ReplayRequest::new("POST", "/api/dashboard/subjects/1/progress").with_body(json!([0, 1]));
        assert_eq!(progress.payload().unwrap(), Some(b"[0,1]".to_vec()));
    }

    #[test]
    fn test_payload_absent_body() {
        let request = ReplayRequest::new("DELETE", "/x");
        assert_eq!(request.payload().unwrap(), None);
    }

    #[test]
    fn test_success_range() {
        assert!(ReplayResponse::new(200, "").is_success());
        assert!(ReplayResponse::new(204, "").is_success());
        assert!(!ReplayResponse::new(301, "").is_success());
        assert!(!ReplayResponse::new(404, "").is_success());
        assert!(ReplayResponse::new(404, "").is_client_error());
        assert!(!ReplayResponse::new(503, "").is_client_error());
    }

    #[test]
    fn test_assigned_id_string_and_number() {
        let string_id = ReplayResponse::new(200, r#"{"id":"cls-55","grade":"5"}"#);
        assert_eq!(string_id.assigned_id().unwrap(), Some("cls-55".to_string()));

        let numeric_id = ReplayResponse::new(201, r#"{"id":42}"#);
        assert_eq!(numeric_id.assigned_id().unwrap(), Some("42".to_string()));
    }

    #[test]
    fn test_assigned_id_missing_or_invalid() {
        assert_eq!(ReplayResponse::new(200, r#"{"ok":true}"#).assigned_id().unwrap(), None);
        assert_eq!(ReplayResponse::new(200, "[1,2]").assigned_id().unwrap(), None);
        assert!(ReplayResponse::new(200, "not json").assigned_id().is_err());
    }
}
