//! Connectivity tracking.
//!
//! The monitor holds the current online flag. Every offline to online
//! transition starts one background sync pass; the engine's single-flight
//! guard turns overlapping triggers into no-ops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use super::engine::{SyncEngine, SyncOutcome};
use super::events::{StatusBus, StatusEvent};
use crate::transport::Transport;

/// Synchronous read of the host's current connectivity.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

impl<F> ConnectivityProbe for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_online(&self) -> bool {
        self()
    }
}

/// Tracks connectivity and triggers sync on reconnect.
pub struct ConnectivityMonitor<T: Transport + 'static> {
    online: AtomicBool,
    engine: Arc<SyncEngine<T>>,
    bus: Arc<StatusBus>,
}

impl<T: Transport + 'static> ConnectivityMonitor<T> {
    /// Create a monitor, reading the probe once for the initial state.
    ///
    /// Starting online does not trigger a sync; only transitions do.
    pub fn new(probe: &dyn ConnectivityProbe, engine: Arc<SyncEngine<T>>, bus: Arc<StatusBus>) -> Self {
        let online = probe.is_online();
        debug!(online, "initial connectivity");
        Self {
            online: AtomicBool::new(online),
            engine,
            bus,
        }
    }

    /// Current connectivity.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Whether the engine is replaying right now.
    pub fn is_syncing(&self) -> bool {
        self.engine.is_syncing()
    }

    /// Record a connectivity signal.
    ///
    /// Repeating the current state does nothing. Going online publishes
    /// [`StatusEvent::Online`] and spawns a sync pass, whose handle is
    /// returned. Going offline publishes [`StatusEvent::Offline`] and leaves
    /// any running pass alone.
    pub fn set_online(&self, online: bool) -> Option<JoinHandle<()>> {
        if self.online.swap(online, Ordering::AcqRel) == online {
            return None;
        }

        if !online {
            info!("connection lost; requests will be queued");
            self.bus.publish(&StatusEvent::Offline);
            return None;
        }

        info!("connection restored; starting sync");
        self.bus.publish(&StatusEvent::Online);
        self.spawn_sync()
    }

    fn spawn_sync(&self) -> Option<JoinHandle<()>> {
        let engine = Arc::clone(&self.engine);
        let spawned = thread::Builder::new()
            .name("classync-sync".to_string())
            .spawn(move || match engine.sync() {
                Ok(SyncOutcome::Completed(report)) => {
                    debug!(replayed = report.replayed, failed = report.failed, "background sync done");
                }
                Ok(SyncOutcome::AlreadyRunning) => debug!("sync already running"),
                Err(e) => error!("background sync failed: {e}"),
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("could not start sync thread: {e}");
                None
            }
        }
    }

    /// Poll `probe` every `interval`, feeding each reading to
    /// [`set_online`](Self::set_online), until `stop` is set.
    ///
    /// Sync passes started here run on their own threads; the loop waits
    /// for any still running before it returns.
    pub fn watch(&self, probe: &dyn ConnectivityProbe, interval: Duration, stop: &AtomicBool) {
        let mut passes = Vec::new();

        while !stop.load(Ordering::Acquire) {
            if let Some(handle) = self.set_online(probe.is_online()) {
                passes.push(handle);
            }
            passes.retain(|handle: &JoinHandle<()>| !handle.is_finished());
            thread::sleep(interval);
        }

        for handle in passes {
            if handle.join().is_err() {
                error!("sync thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use super::*;
    use crate::features::sync::queue::QueueStore;
    use crate::features::sync::request::QueuedRequest;
    use crate::storage::Database;
    use crate::transport::{ReplayRequest, ReplayResponse, TransportError};

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    impl Transport for CountingTransport {
        fn send(&self, _request: &ReplayRequest) -> Result<ReplayResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ReplayResponse::new(200, "{}"))
        }
    }

    fn setup(initially_online: bool) -> (Arc<QueueStore>, Arc<StatusBus>, ConnectivityMonitor<CountingTransport>) {
        let queue = Arc::new(QueueStore::with_database(Database::open_in_memory().unwrap()));
        let bus = Arc::new(StatusBus::new());
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&queue),
            CountingTransport::default(),
            Arc::clone(&bus),
        ));
        let probe = move || initially_online;
        let monitor = ConnectivityMonitor::new(&probe, engine, Arc::clone(&bus));
        (queue, bus, monitor)
    }

    fn enqueue(queue: &QueueStore, url: &str) {
        queue
            .add(&QueuedRequest::new(url, "POST", None, BTreeMap::new(), None))
            .unwrap();
    }

    #[test]
    fn test_initial_state_from_probe() {
        let (_, _, online) = setup(true);
        assert!(online.is_online());

        let (_, _, offline) = setup(false);
        assert!(!offline.is_online());
        assert!(!offline.is_syncing());
    }

    #[test]
    fn test_reconnect_triggers_sync() {
        let (queue, _, monitor) = setup(false);
        enqueue(&queue, "/a");

        let handle = monitor.set_online(true).unwrap();
        handle.join().unwrap();

        assert!(monitor.is_online());
        assert!(queue.is_empty().unwrap());
        assert_eq!(monitor.engine.transport().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeated_online_signal_is_ignored() {
        let (queue, _, monitor) = setup(false);
        enqueue(&queue, "/a");

        let handle = monitor.set_online(true).unwrap();
        assert!(monitor.set_online(true).is_none());
        handle.join().unwrap();

        assert_eq!(monitor.engine.transport().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_going_offline_does_not_sync() {
        let (queue, _, monitor) = setup(true);
        enqueue(&queue, "/a");

        assert!(monitor.set_online(false).is_none());
        assert!(!monitor.is_online());
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn test_transitions_published() {
        let (_, bus, monitor) = setup(true);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(move |event| {
            if matches!(event, StatusEvent::Online | StatusEvent::Offline) {
                sink.lock().unwrap().push(event.clone());
            }
        });

        monitor.set_online(false);
        if let Some(handle) = monitor.set_online(true) {
            handle.join().unwrap();
        }

        assert_eq!(
            *seen.lock().unwrap(),
            vec![StatusEvent::Offline, StatusEvent::Online]
        );
    }

    #[test]
    fn test_watch_syncs_on_reconnect_and_stops() {
        let (queue, _, monitor) = setup(false);
        enqueue(&queue, "/a");

        let readings = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        // Offline for the first reading, online after; stop once drained
        let probe = || {
            let n = readings.fetch_add(1, Ordering::SeqCst);
            if n >= 2 && queue.is_empty().unwrap_or(false) {
                stop.store(true, Ordering::Release);
            }
            n > 0
        };

        monitor.watch(&probe, Duration::from_millis(5), &stop);

        assert!(monitor.is_online());
        assert!(queue.is_empty().unwrap());
        assert_eq!(monitor.engine.transport().calls.load(Ordering::SeqCst), 1);
    }
}
