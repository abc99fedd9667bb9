//! Configuration management for classync.
//!
//! This module handles loading and saving configuration from `~/.classync/`.

mod paths;
mod settings;

pub use paths::{Paths, HOME_ENV};
pub use settings::{ApiConfig, Config, GeneralConfig, SyncConfig, TOKEN_ENV};
