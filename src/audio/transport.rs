use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by an [`AudioTransport`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no audio output device: {0}")]
    NoOutputDevice(String),

    #[error("unsupported locator: {0}")]
    Unsupported(String),

    #[error("failed to open {locator}: {source}")]
    Open {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {locator}: {reason}")]
    Decode { locator: String, reason: String },

    #[error("failed to start the playback thread: {0}")]
    Thread(#[source] std::io::Error),
}

/// A decoder plus output with at most one open handle.
///
/// Only the playback engine drives a transport. Every mutator is a no-op when
/// nothing is open.
pub trait AudioTransport {
    /// Open `locator`, releasing any previously open handle. The new handle
    /// starts paused at position zero.
    fn open(&mut self, locator: &str) -> Result<(), TransportError>;

    fn start(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    fn seek(&mut self, position_ms: u64);

    fn release(&mut self);

    fn is_open(&self) -> bool;

    /// Last known position of the open handle, 0 when closed.
    fn position(&self) -> u64;

    /// `None` until the decoder knows the length.
    fn duration(&self) -> Option<u64>;

    /// `true` exactly once after the open handle reached its natural end.
    fn take_completion(&mut self) -> bool;
}

/// Map a locator to a local path. Only `file://` URIs and bare paths are playable.
pub fn local_path(locator: &str) -> Result<PathBuf, TransportError> {
    if let Some(rest) = locator.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    if locator.contains("://") {
        return Err(TransportError::Unsupported(locator.to_string()));
    }
    if locator.trim().is_empty() {
        return Err(TransportError::Unsupported("empty locator".to_string()));
    }
    Ok(PathBuf::from(locator))
}
