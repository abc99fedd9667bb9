//! Queued request records.
//!
//! A `QueuedRequest` is one deferred mutating HTTP call, captured with the
//! headers (and therefore the credential) it had when it was enqueued.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::transport::ReplayRequest;

/// Prefix of client-generated placeholder ids.
pub const TEMP_ID_PREFIX: &str = "temp-";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TEMP_ID_SUFFIX_LEN: usize = 9;

/// A deferred mutating request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedRequest {
    /// Store-assigned id; `None` until first persisted.
    pub id: Option<i64>,
    /// Target endpoint.
    pub url: String,
    /// HTTP verb.
    pub method: String,
    /// JSON payload; `None` for bodyless requests.
    pub body: Option<serde_json::Value>,
    /// Headers captured at enqueue time.
    pub headers: BTreeMap<String, String>,
    /// Creation time in milliseconds since the epoch. Defines replay order.
    pub timestamp: i64,
    /// Placeholder id of the entity this request creates, if any.
    pub temp_id: Option<String>,
    /// Failed replay attempts so far.
    #[serde(default)]
    pub attempts: u32,
    /// Most recent replay failure.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl QueuedRequest {
    /// Create an unpersisted request stamped with the current time.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        method: impl Into<String>,
        body: Option<serde_json::Value>,
        headers: BTreeMap<String, String>,
        temp_id: Option<String>,
    ) -> Self {
        Self {
            id: None,
            url: url.into(),
            method: method.into(),
            body,
            headers,
            timestamp: Utc::now().timestamp_millis(),
            temp_id,
            attempts: 0,
            last_error: None,
        }
    }

    /// Override the creation timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Creation time as a date, for display.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Whether this request's URL embeds `temp_id`.
    #[must_use]
    pub fn references(&self, temp_id: &str) -> bool {
        !temp_id.is_empty() && self.url.contains(temp_id)
    }

    /// The network call this entry describes.
    #[must_use]
    pub fn to_replay(&self) -> ReplayRequest {
        ReplayRequest {
            url: self.url.clone(),
            method: self.method.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// Partial update of a queued request. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPatch {
    pub url: Option<String>,
    pub method: Option<String>,
    pub body: Option<Option<serde_json::Value>>,
    pub headers: Option<BTreeMap<String, String>>,
    pub timestamp: Option<i64>,
    pub temp_id: Option<Option<String>>,
}

impl RequestPatch {
    /// A patch that only rewrites the URL.
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Apply the patch in place.
    pub fn apply(self, request: &mut QueuedRequest) {
        if let Some(url) = self.url {
            request.url = url;
        }
        if let Some(method) = self.method {
            request.method = method;
        }
        if let Some(body) = self.body {
            request.body = body;
        }
        if let Some(headers) = self.headers {
            request.headers = headers;
        }
        if let Some(timestamp) = self.timestamp {
            request.timestamp = timestamp;
        }
        if let Some(temp_id) = self.temp_id {
            request.temp_id = temp_id;
        }
    }
}

/// Generate a placeholder id: `temp-<ms>-<9 base36 chars>`.
#[must_use]
pub fn new_temp_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..TEMP_ID_SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
        .collect();
    format!(
        "{TEMP_ID_PREFIX}{}-{suffix}",
        Utc::now().timestamp_millis()
    )
}

/// Whether `id` is a client-generated placeholder.
#[must_use]
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}
