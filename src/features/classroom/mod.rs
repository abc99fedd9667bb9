//! Classroom write path.
//!
//! Classroom mutations go through [`OfflineSync`](crate::features::sync::OfflineSync):
//! sent immediately when the API is reachable, queued otherwise. Creations
//! made offline get a temp id the caller can render right away.

pub mod service;
pub mod types;

pub use service::{ClassroomService, Delivery, SUBJECTS_PATH};
pub use types::{Classroom, CreateClassroom};
