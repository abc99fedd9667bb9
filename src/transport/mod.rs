//! Delivery of HTTP requests to the dashboard API.
//!
//! The [`Transport`] trait is the seam the sync engine and write path send
//! through; [`HttpTransport`] is the real implementation.

pub mod client;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{HttpProbe, HttpTransport, Transport};
pub use types::{ReplayRequest, ReplayResponse, TransportError};

#[cfg(test)]
pub use client::MockTransport;
