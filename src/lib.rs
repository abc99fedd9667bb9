//! classync - offline request queue and sync for the classroom dashboard
//!
//! Mutating dashboard calls that cannot reach the server are persisted to a
//! local SQLite queue and replayed in creation order once connectivity
//! returns, with client-generated temp ids swapped for server-assigned ids.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod output;
pub mod storage;
pub mod transport;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::ClassyncError;
pub use features::sync::{OfflineSync, QueueStore, SyncEngine};
