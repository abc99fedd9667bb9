//! Offline-aware write path.
//!
//! `OfflineSync` ties the queue, engine and monitor together and is the
//! one handle write-path callers hold.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info};

use super::connectivity::{ConnectivityMonitor, ConnectivityProbe};
use super::engine::{EngineConfig, SyncEngine, SyncOutcome};
use super::events::{StatusBus, StatusEvent, SubscriptionId};
use super::queue::QueueStore;
use super::request::QueuedRequest;
use crate::error::ClassyncError;
use crate::transport::{ReplayRequest, ReplayResponse, Transport};

/// What happened to a mutating call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The server answered (any status).
    Sent(ReplayResponse),
    /// Deferred to the queue.
    Queued {
        /// Queue entry id.
        id: i64,
        /// Placeholder id tagged on the entry, if any.
        temp_id: Option<String>,
    },
}

impl WriteOutcome {
    /// Whether the call was deferred.
    #[must_use]
    pub const fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}

/// Queue, sync engine and connectivity monitor behind one handle.
pub struct OfflineSync<T: Transport + 'static> {
    queue: Arc<QueueStore>,
    engine: Arc<SyncEngine<T>>,
    monitor: ConnectivityMonitor<T>,
    bus: Arc<StatusBus>,
}

impl<T: Transport + 'static> OfflineSync<T> {
    /// Wire everything up. The probe is read once for the initial state.
    pub fn new(
        queue: Arc<QueueStore>,
        transport: T,
        probe: &dyn ConnectivityProbe,
        config: EngineConfig,
    ) -> Self {
        let bus = Arc::new(StatusBus::new());
        let engine = Arc::new(SyncEngine::with_config(
            Arc::clone(&queue),
            transport,
            Arc::clone(&bus),
            config,
        ));
        let monitor = ConnectivityMonitor::new(probe, Arc::clone(&engine), Arc::clone(&bus));

        Self {
            queue,
            engine,
            monitor,
            bus,
        }
    }

    /// Persist a request for later replay and return its queue id.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot store it. There is no fallback.
    pub fn enqueue(
        &self,
        url: &str,
        method: &str,
        body: Option<serde_json::Value>,
        headers: BTreeMap<String, String>,
        temp_id: Option<String>,
    ) -> Result<i64, ClassyncError> {
        let request = QueuedRequest::new(url, method, body, headers, temp_id);
        let id = self.queue.add(&request)?;
        info!(id, method, url, temp_id = ?request.temp_id, "request queued for sync");
        Ok(id)
    }

    /// Send `request` now, or queue it if the network is out of reach.
    ///
    /// Connectivity is considered lost when the monitor already says so or
    /// when the transport reports a connectivity failure. Any answer from
    /// the server, including a rejection, comes back as
    /// [`WriteOutcome::Sent`] for the caller to interpret.
    ///
    /// # Errors
    ///
    /// Returns an error for non-connectivity transport failures, or if the
    /// request cannot be queued.
    pub fn send_or_enqueue(
        &self,
        request: ReplayRequest,
        temp_id: Option<String>,
    ) -> Result<WriteOutcome, ClassyncError> {
        if self.is_online() {
            match self.engine.transport().send(&request) {
                Ok(response) => return Ok(WriteOutcome::Sent(response)),
                Err(e) if e.is_connectivity() => {
                    debug!(url = %request.url, "network unreachable: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let id = self.enqueue(
            &request.url,
            &request.method,
            request.body,
            request.headers,
            temp_id.clone(),
        )?;
        Ok(WriteOutcome::Queued { id, temp_id })
    }

    /// Current connectivity.
    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Whether a sync pass is running.
    pub fn is_syncing(&self) -> bool {
        self.engine.is_syncing()
    }

    /// Drop every queued entry tagged with `temp_id`. Returns how many went.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be updated.
    pub fn cancel_queued_by_temp_id(&self, temp_id: &str) -> Result<usize, ClassyncError> {
        let removed = self.queue.delete_by_temp_id(temp_id)?;
        info!(temp_id, removed, "cancelled queued creation");
        Ok(removed)
    }

    /// Run a sync pass on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub fn sync_now(&self) -> Result<SyncOutcome, ClassyncError> {
        self.engine.sync()
    }

    /// Feed a connectivity signal to the monitor.
    pub fn set_online(&self, online: bool) -> Option<JoinHandle<()>> {
        self.monitor.set_online(online)
    }

    /// Register a status listener.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(listener)
    }

    /// Remove a status listener.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// The monitor, for polling loops.
    pub const fn monitor(&self) -> &ConnectivityMonitor<T> {
        &self.monitor
    }

    /// The underlying queue.
    pub fn queue(&self) -> &QueueStore {
        &self.queue
    }

    /// The transport used for live calls and replays.
    pub fn transport(&self) -> &T {
        self.engine.transport()
    }
}
