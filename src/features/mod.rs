//! Feature implementations for classync.
//!
//! - Offline request queue and sync engine
//! - Classroom write path built on top of it

pub mod classroom;
pub mod sync;
