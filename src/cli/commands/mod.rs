//! Command implementations for classync.
//!
//! This module contains the implementation of all CLI commands.

mod classroom;
mod queue;
mod sync;

pub use classroom::classroom;
pub use queue::queue;
pub use sync::{sync, watch};

use std::sync::Arc;

use crate::config::Config;
use crate::error::ClassyncError;
use crate::features::sync::{OfflineSync, QueueStore};
use crate::transport::{HttpProbe, HttpTransport};

/// Everything a networked command needs.
pub struct Session {
    pub config: Config,
    pub sync: OfflineSync<HttpTransport>,
    pub probe: HttpProbe,
}

impl Session {
    /// Open the queue and connect the transport and probe to `api.base_url`.
    ///
    /// The API host is probed once here for the initial connectivity state.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be opened or the HTTP client
    /// cannot be built.
    pub fn open(config: Config) -> Result<Self, ClassyncError> {
        let queue = Arc::new(QueueStore::new()?);
        let transport = HttpTransport::new(&config.api.base_url, config.api.timeout())?;
        let probe = HttpProbe::new(transport.base_url(), config.api.timeout())?;
        let sync = OfflineSync::new(queue, transport, &probe, config.sync.engine_config());

        Ok(Self {
            config,
            sync,
            probe,
        })
    }
}
