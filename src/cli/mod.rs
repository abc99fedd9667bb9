//! Command-line interface for classync.

pub mod args;
pub mod commands;
