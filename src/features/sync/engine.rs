//! Sync engine for replaying queued requests.
//!
//! One pass loads the whole queue, replays it oldest first, removes what
//! succeeds and keeps what fails. When a creation queued under a temp id
//! succeeds, the server-assigned id is spliced into every other queued URL
//! that still refers to the temp id, so dependent requests hit the real
//! resource.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colored::Colorize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::events::{StatusBus, StatusEvent};
use super::queue::QueueStore;
use super::request::{QueuedRequest, RequestPatch};
use crate::error::ClassyncError;
use crate::transport::{ReplayResponse, Transport, TransportError};

/// Configuration for the sync engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Drop an entry once it has failed this many times and the latest
    /// failure was a 4xx rejection. `None` retries forever.
    pub discard_after_rejections: Option<u32>,
}

/// Why a single replay failed.
#[derive(Debug, Error)]
pub enum ReplayFailure {
    /// No response at all.
    #[error(transparent)]
    Network(#[from] TransportError),
    /// Non-2xx response.
    #[error("server rejected request with status {}", .0.status)]
    Rejected(ReplayResponse),
}

impl ReplayFailure {
    const fn is_client_rejection(&self) -> bool {
        matches!(self, Self::Rejected(response) if response.is_client_error())
    }
}

/// Why a temp id could not be resolved after a successful creation.
#[derive(Debug, Error)]
pub enum RewriteFailure {
    /// The creation response was not JSON.
    #[error("unreadable creation response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    /// A dependent entry could not be updated.
    #[error("failed to rewrite request {id}: {source}")]
    Storage {
        /// Dependent entry id.
        id: i64,
        /// Underlying storage error.
        source: ClassyncError,
    },
}

/// What happened to one entry during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Replayed and removed from the queue.
    Replayed,
    /// Failed; still queued.
    Failed,
    /// Failed too often and removed without success.
    Discarded,
    /// No id; left alone.
    Skipped,
}

/// Result of replaying a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryResult {
    /// Queue id
    pub id: Option<i64>,
    /// HTTP verb
    pub method: String,
    /// URL as replayed
    pub url: String,
    /// Outcome
    pub status: EntryStatus,
    /// Error message if failed
    pub error: Option<String>,
}

impl EntryResult {
    fn new(entry: &QueuedRequest, status: EntryStatus, error: Option<String>) -> Self {
        Self {
            id: entry.id,
            method: entry.method.clone(),
            url: entry.url.clone(),
            status,
            error,
        }
    }
}

/// Summary of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries replayed and removed
    pub replayed: usize,
    /// Entries that failed and stay queued
    pub failed: usize,
    /// Entries dropped after repeated rejection
    pub discarded: usize,
    /// Entries skipped for lack of an id
    pub skipped: usize,
    /// Dependent URLs rewritten from a temp id to a real id
    pub rewritten: usize,
    /// Temp id resolutions that failed
    pub rewrite_failures: usize,
    /// Individual results, in replay order
    pub entries: Vec<EntryResult>,
}

impl SyncReport {
    /// Add a result.
    pub fn add(&mut self, result: EntryResult) {
        match result.status {
            EntryStatus::Replayed => self.replayed += 1,
            EntryStatus::Failed => self.failed += 1,
            EntryStatus::Discarded => self.discarded += 1,
            EntryStatus::Skipped => self.skipped += 1,
        }
        self.entries.push(result);
    }

    /// Check if every processed entry was replayed.
    #[must_use]
    pub const fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.discarded == 0
    }

    /// Get total entries processed.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.replayed + self.failed + self.discarded + self.skipped
    }
}

/// Result of asking for a sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another pass was running; nothing was done.
    AlreadyRunning,
    /// A pass ran to the end.
    Completed(SyncReport),
}

/// Holds the in-progress flag for the duration of a pass.
///
/// Dropping the guard clears the flag, so a panic inside a pass cannot
/// leave sync switched off.
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Replays the durable queue against a transport.
pub struct SyncEngine<T: Transport> {
    queue: Arc<QueueStore>,
    transport: T,
    bus: Arc<StatusBus>,
    config: EngineConfig,
    syncing: AtomicBool,
}

impl<T: Transport> SyncEngine<T> {
    /// Create an engine.
    pub fn new(queue: Arc<QueueStore>, transport: T, bus: Arc<StatusBus>) -> Self {
        Self::with_config(queue, transport, bus, EngineConfig::default())
    }

    /// Create an engine with custom config.
    pub const fn with_config(
        queue: Arc<QueueStore>,
        transport: T,
        bus: Arc<StatusBus>,
        config: EngineConfig,
    ) -> Self {
        Self {
            queue,
            transport,
            bus,
            config,
            syncing: AtomicBool::new(false),
        }
    }

    /// Whether a pass is running right now.
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// The transport replays go through.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one sync pass, unless one is already running.
    ///
    /// Replay failures never surface here; they are logged and the entries
    /// stay queued.
    ///
    /// # Errors
    ///
    /// Returns an error only if the queue cannot be read at the start of
    /// the pass.
    pub fn sync(&self) -> Result<SyncOutcome, ClassyncError> {
        let Some(guard) = PassGuard::acquire(&self.syncing) else {
            debug!("sync already in progress; ignoring trigger");
            return Ok(SyncOutcome::AlreadyRunning);
        };

        self.bus.publish(&StatusEvent::SyncStarted);
        let result = self.run_pass();
        drop(guard);

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                error!("sync failed: {e}");
                self.bus.publish(&StatusEvent::SyncFinished(SyncReport::default()));
                return Err(e);
            }
        };

        self.bus.publish(&StatusEvent::SyncFinished(report.clone()));
        Ok(SyncOutcome::Completed(report))
    }

    fn run_pass(&self) -> Result<SyncReport, ClassyncError> {
        let mut report = SyncReport::default();
        let mut entries = self.queue.get_all()?;

        if entries.is_empty() {
            debug!("queue empty");
            return Ok(report);
        }

        // Stable: equal timestamps keep storage order
        entries.sort_by_key(|entry| entry.timestamp);
        info!(count = entries.len(), "replaying queued requests");

        let mut removed = vec![false; entries.len()];

        for idx in 0..entries.len() {
            let Some(id) = entries[idx].id else {
                warn!(url = %entries[idx].url, "skipping queued request without id");
                report.add(EntryResult::new(&entries[idx], EntryStatus::Skipped, None));
                continue;
            };

            debug!(id, method = %entries[idx].method, url = %entries[idx].url, "replaying request");

            let failure = match self.transport.send(&entries[idx].to_replay()) {
                Ok(response) if response.is_success() => {
                    if let Some(temp_id) = entries[idx].temp_id.clone() {
                        match self.resolve_temp_id(&mut entries, &removed, idx, &temp_id, &response)
                        {
                            Ok(count) => report.rewritten += count,
                            Err(e) => {
                                warn!(id, temp_id = %temp_id, "smart sync failed: {e}");
                                report.rewrite_failures += 1;
                            }
                        }
                    }

                    match self.queue.delete_by_id(id) {
                        Ok(_) => removed[idx] = true,
                        Err(e) => error!(id, "replayed request could not be removed: {e}"),
                    }
                    info!(id, url = %entries[idx].url, "request synced");
                    report.add(EntryResult::new(&entries[idx], EntryStatus::Replayed, None));
                    continue;
                }
                Ok(response) => ReplayFailure::Rejected(response),
                Err(e) => ReplayFailure::Network(e),
            };

            let status = self.handle_failure(&entries[idx], id, &failure);
            if status == EntryStatus::Discarded {
                removed[idx] = true;
            }
            report.add(EntryResult::new(
                &entries[idx],
                status,
                Some(failure.to_string()),
            ));
        }

        info!(
            replayed = report.replayed,
            failed = report.failed,
            rewritten = report.rewritten,
            "sync pass finished"
        );
        Ok(report)
    }

    /// Splice the server-assigned id into every other live entry whose URL
    /// still carries `temp_id`. Returns the number of entries rewritten.
    fn resolve_temp_id(
        &self,
        entries: &mut [QueuedRequest],
        removed: &[bool],
        current: usize,
        temp_id: &str,
        response: &ReplayResponse,
    ) -> Result<usize, RewriteFailure> {
        let Some(real_id) = response.assigned_id()? else {
            debug!(temp_id, "creation response carried no id");
            return Ok(0);
        };

        info!(temp_id, real_id = %real_id, "replacing temp id in queued requests");

        let mut rewritten = 0;
        let mut first_failure = None;

        for (idx, entry) in entries.iter_mut().enumerate() {
            if idx == current || removed[idx] || !entry.references(temp_id) {
                continue;
            }
            let Some(entry_id) = entry.id else {
                continue;
            };

            let new_url = entry.url.replacen(temp_id, &real_id, 1);
            match self.queue.update(entry_id, RequestPatch::url(new_url.clone())) {
                Ok(_) => {
                    debug!(id = entry_id, url = %new_url, "rewrote dependent request");
                    entry.url = new_url;
                    rewritten += 1;
                }
                Err(source) => {
                    warn!(id = entry_id, "failed to rewrite dependent request: {source}");
                    if first_failure.is_none() {
                        first_failure = Some(RewriteFailure::Storage {
                            id: entry_id,
                            source,
                        });
                    }
                }
            }
        }

        first_failure.map_or(Ok(rewritten), Err)
    }

    fn handle_failure(&self, entry: &QueuedRequest, id: i64, failure: &ReplayFailure) -> EntryStatus {
        warn!(id, method = %entry.method, url = %entry.url, "failed to sync request: {failure}");

        let attempts = match self.queue.record_failure(id, &failure.to_string()) {
            Ok(Some(attempts)) => attempts,
            Ok(None) => return EntryStatus::Failed,
            Err(e) => {
                error!(id, "could not record failed attempt: {e}");
                return EntryStatus::Failed;
            }
        };

        let exhausted = self
            .config
            .discard_after_rejections
            .is_some_and(|max| attempts >= max);

        if exhausted && failure.is_client_rejection() {
            match self.queue.delete_by_id(id) {
                Ok(_) => {
                    warn!(id, attempts, url = %entry.url, "discarding request rejected by server");
                    return EntryStatus::Discarded;
                }
                Err(e) => error!(id, "could not discard rejected request: {e}"),
            }
        }

        EntryStatus::Failed
    }
}

/// Format a sync report for display.
#[must_use]
pub fn format_sync_report(report: &SyncReport) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Sync completed: {} requests", report.total()));
    lines.push("─".repeat(40));

    if report.replayed > 0 {
        lines.push(format!(
            "  {} {}",
            "✓".green(),
            format!("{} replayed", report.replayed).green()
        ));
    }

    if report.failed > 0 {
        lines.push(format!(
            "  {} {}",
            "✗".red(),
            format!("{} failed (still queued)", report.failed).red()
        ));
    }

    if report.discarded > 0 {
        lines.push(format!(
            "  {} {}",
            "✗".red(),
            format!("{} discarded", report.discarded).red()
        ));
    }

    if report.skipped > 0 {
        lines.push(format!(
            "  {} {}",
            "○".yellow(),
            format!("{} skipped", report.skipped).yellow()
        ));
    }

    if report.rewritten > 0 {
        lines.push(format!(
            "  {} {} dependent URLs rewritten",
            "↻".cyan(),
            report.rewritten
        ));
    }

    let errors: Vec<_> = report
        .entries
        .iter()
        .filter(|r| r.error.is_some())
        .take(3)
        .collect();

    if !errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors:".to_string());
        for err in errors {
            lines.push(format!(
                "  - {} {}: {}",
                err.method,
                err.url,
                err.error.as_deref().unwrap_or("Unknown error")
            ));
        }
    }

    lines.join("\n")
}
