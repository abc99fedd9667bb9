//! Offline request queue and sync.
//!
//! Mutating calls that cannot reach the server are persisted to a SQLite
//! queue and replayed, oldest first, once connectivity returns.
//!
//! Features:
//! - Durable queue that survives restarts
//! - Single-flight replay passes
//! - Temp id rewriting once the server assigns a real id
//! - Status events for connectivity and sync progress

pub mod connectivity;
pub mod engine;
pub mod events;
pub mod offline;
pub mod queue;
pub mod request;

pub use connectivity::{ConnectivityMonitor, ConnectivityProbe};
pub use engine::{
    format_sync_report, EngineConfig, EntryResult, EntryStatus, ReplayFailure, RewriteFailure,
    SyncEngine, SyncOutcome, SyncReport,
};
pub use events::{StatusBus, StatusEvent, SubscriptionId};
pub use offline::{OfflineSync, WriteOutcome};
pub use queue::{QueueStats, QueueStore};
pub use request::{is_temp_id, new_temp_id, QueuedRequest, RequestPatch, TEMP_ID_PREFIX};
