//! Storage layer for classync.
//!
//! This module provides SQLite-based persistence for the offline request
//! queue. The database file outlives the process, so queued mutations
//! survive restarts.

mod database;
mod migrations;

pub use database::Database;
