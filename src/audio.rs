//! Audio transport: one decoder/output handle at a time.
//!
//! The trait lives in `transport`; `sink` provides the `rodio` implementation
//! used by the binary.

mod sink;
mod transport;

#[cfg(test)]
pub(crate) mod scripted;

pub use sink::RodioTransport;
pub use transport::{AudioTransport, TransportError, local_path};
