//! Request queue storage and management.
//!
//! Provides persistence and querying of queued requests. Every operation
//! touches its records atomically; none of them orders the results for
//! replay, which is the sync engine's job.

use std::collections::BTreeMap;

use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use super::request::{QueuedRequest, RequestPatch};
use crate::error::ClassyncError;
use crate::storage::Database;

const SELECT_COLUMNS: &str =
    "SELECT id, url, method, body, headers, timestamp, temp_id, attempts, last_error FROM request_queue";

/// Durable queue of deferred requests.
pub struct QueueStore {
    db: Database,
}

impl QueueStore {
    /// Open the queue at the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn new() -> Result<Self, ClassyncError> {
        let db = Database::open()?;
        Ok(Self { db })
    }

    /// Create a queue over an existing database connection.
    #[must_use]
    pub const fn with_database(db: Database) -> Self {
        Self { db }
    }

    /// Ensure the schema exists. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub fn initialize(&self) -> Result<(), ClassyncError> {
        self.db.migrate()
    }

    /// Persist a new request and return its assigned id.
    ///
    /// Any `id` already on `request` is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be saved.
    pub fn add(&self, request: &QueuedRequest) -> Result<i64, ClassyncError> {
        let body = request.body.as_ref().map(serde_json::to_string).transpose()?;
        let headers = serde_json::to_string(&request.headers)?;

        self.db.with_connection(|conn| {
            conn.execute(
                r"INSERT INTO request_queue (url, method, body, headers, timestamp, temp_id, attempts, last_error)
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    request.url,
                    request.method,
                    body,
                    headers,
                    request.timestamp,
                    request.temp_id,
                    request.attempts,
                    request.last_error,
                ],
            )
            .map_err(|e| ClassyncError::Storage(format!("Failed to enqueue request: {e}")))?;

            Ok(conn.last_insert_rowid())
        })
    }

    /// Get every queued request, in no particular replay order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_all(&self) -> Result<Vec<QueuedRequest>, ClassyncError> {
        self.db.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))
                .map_err(|e| ClassyncError::Storage(format!("Failed to prepare query: {e}")))?;

            let rows = stmt
                .query_map([], row_to_request)
                .map_err(|e| ClassyncError::Storage(format!("Failed to query queue: {e}")))?;

            let mut requests = Vec::new();
            for row in rows {
                requests.push(row.map_err(|e| ClassyncError::Storage(e.to_string()))?);
            }
            Ok(requests)
        })
    }

    /// Get a specific request by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_by_id(&self, id: i64) -> Result<Option<QueuedRequest>, ClassyncError> {
        self.db.with_connection(|conn| {
            conn.query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), [id], row_to_request)
                .optional()
                .map_err(|e| ClassyncError::Storage(format!("Failed to query request: {e}")))
        })
    }

    /// Get every request created under `temp_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_by_temp_id(&self, temp_id: &str) -> Result<Vec<QueuedRequest>, ClassyncError> {
        self.db.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!("{SELECT_COLUMNS} WHERE temp_id = ?1 ORDER BY id"))
                .map_err(|e| ClassyncError::Storage(format!("Failed to prepare query: {e}")))?;

            let rows = stmt
                .query_map([temp_id], row_to_request)
                .map_err(|e| ClassyncError::Storage(format!("Failed to query queue: {e}")))?;

            let mut requests = Vec::new();
            for row in rows {
                requests.push(row.map_err(|e| ClassyncError::Storage(e.to_string()))?);
            }
            Ok(requests)
        })
    }

    /// Apply a partial update. Returns `false` if no such request exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update(&self, id: i64, patch: RequestPatch) -> Result<bool, ClassyncError> {
        self.db.with_connection(|conn| {
            let tx = conn
                .transaction()
                .map_err(|e| ClassyncError::Storage(format!("Failed to begin update: {e}")))?;

            let current = tx
                .query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), [id], row_to_request)
                .optional()
                .map_err(|e| ClassyncError::Storage(format!("Failed to query request: {e}")))?;

            let Some(mut request) = current else {
                return Ok(false);
            };
            patch.apply(&mut request);

            let body = request.body.as_ref().map(serde_json::to_string).transpose()?;
            let headers = serde_json::to_string(&request.headers)?;

            tx.execute(
                r"UPDATE request_queue SET
                  url = ?1, method = ?2, body = ?3, headers = ?4, timestamp = ?5, temp_id = ?6
                  WHERE id = ?7",
                params![
                    request.url,
                    request.method,
                    body,
                    headers,
                    request.timestamp,
                    request.temp_id,
                    id,
                ],
            )
            .map_err(|e| ClassyncError::Storage(format!("Failed to update request: {e}")))?;

            tx.commit()
                .map_err(|e| ClassyncError::Storage(format!("Failed to commit update: {e}")))?;
            Ok(true)
        })
    }

    /// Increment the attempt count and record the error.
    ///
    /// Returns the new attempt count, or `None` if the request is gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn record_failure(&self, id: i64, error: &str) -> Result<Option<u32>, ClassyncError> {
        self.db.with_connection(|conn| {
            let tx = conn
                .transaction()
                .map_err(|e| ClassyncError::Storage(format!("Failed to begin update: {e}")))?;

            let rows = tx
                .execute(
                    r"UPDATE request_queue SET attempts = attempts + 1, last_error = ?1
                      WHERE id = ?2",
                    params![error, id],
                )
                .map_err(|e| ClassyncError::Storage(format!("Failed to record attempt: {e}")))?;
            if rows == 0 {
                return Ok(None);
            }

            let attempts: u32 = tx
                .query_row("SELECT attempts FROM request_queue WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .map_err(|e| ClassyncError::Storage(format!("Failed to read attempts: {e}")))?;

            tx.commit()
                .map_err(|e| ClassyncError::Storage(format!("Failed to commit attempt: {e}")))?;
            Ok(Some(attempts))
        })
    }

    /// Delete a request. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_by_id(&self, id: i64) -> Result<bool, ClassyncError> {
        self.db.with_connection(|conn| {
            let rows = conn
                .execute("DELETE FROM request_queue WHERE id = ?1", [id])
                .map_err(|e| ClassyncError::Storage(format!("Failed to delete request: {e}")))?;
            Ok(rows > 0)
        })
    }

    /// Delete every request created under `temp_id`. Returns the count.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_by_temp_id(&self, temp_id: &str) -> Result<usize, ClassyncError> {
        self.db.with_connection(|conn| {
            conn.execute("DELETE FROM request_queue WHERE temp_id = ?1", [temp_id])
                .map_err(|e| ClassyncError::Storage(format!("Failed to delete requests: {e}")))
        })
    }

    /// Remove every request. Returns the count.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear(&self) -> Result<usize, ClassyncError> {
        self.db.with_connection(|conn| {
            conn.execute("DELETE FROM request_queue", [])
                .map_err(|e| ClassyncError::Storage(format!("Failed to clear queue: {e}")))
        })
    }

    /// Number of queued requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn len(&self) -> Result<usize, ClassyncError> {
        let count: i64 = self.db.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM request_queue", [], |row| row.get(0))
                .map_err(|e| ClassyncError::Storage(format!("Failed to count requests: {e}")))
        })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Whether the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn is_empty(&self) -> Result<bool, ClassyncError> {
        Ok(self.len()? == 0)
    }

    /// Get queue statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn stats(&self) -> Result<QueueStats, ClassyncError> {
        self.db.with_connection(|conn| {
            conn.query_row(
                r"SELECT COUNT(*),
                         COUNT(temp_id),
                         COALESCE(SUM(CASE WHEN attempts > 0 THEN 1 ELSE 0 END), 0),
                         MIN(timestamp)
                  FROM request_queue",
                [],
                |row| {
                    Ok(QueueStats {
                        pending: row.get(0)?,
                        creations: row.get(1)?,
                        failing: row.get(2)?,
                        oldest_timestamp: row.get(3)?,
                    })
                },
            )
            .map_err(|e| ClassyncError::Storage(format!("Failed to read queue stats: {e}")))
        })
    }
}

/// Queue statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    /// Number of queued requests
    pub pending: i64,
    /// Requests that create an entity under a temp id
    pub creations: i64,
    /// Requests that failed at least one replay
    pub failing: i64,
    /// Creation time (ms) of the oldest request
    pub oldest_timestamp: Option<i64>,
}

fn row_to_request(row: &Row<'_>) -> Result<QueuedRequest, rusqlite::Error> {
    let body_str: Option<String> = row.get(3)?;
    let headers_str: String = row.get(4)?;

    let body = body_str
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let headers: BTreeMap<String, String> = serde_json::from_str(&headers_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(QueuedRequest {
        id: Some(row.get(0)?),
        url: row.get(1)?,
        method: row.get(2)?,
        body,
        headers,
        timestamp: row.get(5)?,
        temp_id: row.get(6)?,
        attempts: row.get(7)?,
        last_error: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_queue() -> QueueStore {
        let db = Database::open_in_memory().unwrap();
        QueueStore::with_database(db)
    }

    fn request(url: &str, timestamp: i64, temp_id: Option<&str>) -> QueuedRequest {
        QueuedRequest::new(
            url,
            "POST",
            Some(json!({"grade": "5"})),
            BTreeMap::from([("Authorization".to_string(), "Bearer abc".to_string())]),
            temp_id.map(String::from),
        )
        .with_timestamp(timestamp)
    }

    #[test]
    fn test_add_and_get() {
        let queue = create_test_queue();

        let id = queue.add(&request("/api/dashboard/subjects", 1000, Some("temp-1"))).unwrap();

        let loaded = queue.get_by_id(id).unwrap().unwrap();
        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.url, "/api/dashboard/subjects");
        assert_eq!(loaded.body, Some(json!({"grade": "5"})));
        assert_eq!(loaded.headers["Authorization"], "Bearer abc");
        assert_eq!(loaded.timestamp, 1000);
        assert_eq!(loaded.temp_id.as_deref(), Some("temp-1"));
    }

    #[test]
    fn test_bodyless_request_roundtrip() {
        let queue = create_test_queue();
        let req = QueuedRequest::new("/x", "DELETE", None, BTreeMap::new(), None);
        let id = queue.add(&req).unwrap();
        assert!(queue.get_by_id(id).unwrap().unwrap().body.is_none());
    }

    #[test]
    fn test_ids_increase_and_are_not_reused() {
        let queue = create_test_queue();

        let first = queue.add(&request("/a", 1, None)).unwrap();
        let second = queue.add(&request("/b", 2, None)).unwrap();
        assert!(second > first);

        assert!(queue.delete_by_id(second).unwrap());
        let third = queue.add(&request("/c", 3, None)).unwrap();
        assert!(third > second);
    }

    #[test]
    fn test_get_all() {
        let queue = create_test_queue();
        queue.add(&request("/a", 3000, None)).unwrap();
        queue.add(&request("/b", 1000, None)).unwrap();

        let all = queue.get_all().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| r.id.is_some()));
    }

    #[test]
    fn test_update_url_only() {
        let queue = create_test_queue();
        let id = queue.add(&request("/subjects/temp-1/progress", 2000, None)).unwrap();

        assert!(queue.update(id, RequestPatch::url("/subjects/cls-55/progress")).unwrap());

        let loaded = queue.get_by_id(id).unwrap().unwrap();
        assert_eq!(loaded.url, "/subjects/cls-55/progress");
        assert_eq!(loaded.method, "POST");
        assert_eq!(loaded.timestamp, 2000);
        assert_eq!(loaded.body, Some(json!({"grade": "5"})));
        assert_eq!(loaded.headers["Authorization"], "Bearer abc");
    }

    #[test]
    fn test_update_missing_returns_false() {
        let queue = create_test_queue();
        assert!(!queue.update(99, RequestPatch::url("/x")).unwrap());
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let queue = create_test_queue();
        queue.add(&request("/a", 1, Some("temp-1"))).unwrap();

        assert!(!queue.delete_by_id(42).unwrap());
        assert_eq!(queue.delete_by_temp_id("temp-404").unwrap(), 0);
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn test_delete_by_temp_id_removes_all_matches() {
        let queue = create_test_queue();
        queue.add(&request("/a", 1, Some("temp-1"))).unwrap();
        queue.add(&request("/b", 2, Some("temp-1"))).unwrap();
        let keep = queue.add(&request("/c", 3, Some("temp-2"))).unwrap();

        assert_eq!(queue.get_by_temp_id("temp-1").unwrap().len(), 2);
        assert_eq!(queue.delete_by_temp_id("temp-1").unwrap(), 2);

        let remaining = queue.get_all().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, Some(keep));
    }

    #[test]
    fn test_record_failure() {
        let queue = create_test_queue();
        let id = queue.add(&request("/a", 1, None)).unwrap();

        assert_eq!(queue.record_failure(id, "status 500").unwrap(), Some(1));
        assert_eq!(queue.record_failure(id, "status 502").unwrap(), Some(2));
        assert_eq!(queue.record_failure(77, "gone").unwrap(), None);

        let loaded = queue.get_by_id(id).unwrap().unwrap();
        assert_eq!(loaded.attempts, 2);
        assert_eq!(loaded.last_error.as_deref(), Some("status 502"));
    }

    #[test]
    fn test_clear() {
        let queue = create_test_queue();
        queue.add(&request("/a", 1, None)).unwrap();
        queue.add(&request("/b", 2, None)).unwrap();

        assert_eq!(queue.clear().unwrap(), 2);
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_stats() {
        let queue = create_test_queue();
        assert_eq!(
            queue.stats().unwrap(),
            QueueStats {
                pending: 0,
                creations: 0,
                failing: 0,
                oldest_timestamp: None,
            }
        );

        queue.add(&request("/a", 2000, Some("temp-1"))).unwrap();
        let id = queue.add(&request("/b", 1000, None)).unwrap();
        queue.record_failure(id, "status 500").unwrap();

        let stats = queue.stats().unwrap();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.creations, 1);
        assert_eq!(stats.failing, 1);
        assert_eq!(stats.oldest_timestamp, Some(1000));
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("queue.db");

        {
            let queue = QueueStore::with_database(Database::open_at(&path).unwrap());
            queue.add(&request("/a", 1, Some("temp-1"))).unwrap();
        }

        let queue = QueueStore::with_database(Database::open_at(&path).unwrap());
        queue.initialize().unwrap();
        let all = queue.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].temp_id.as_deref(), Some("temp-1"));
    }
}
