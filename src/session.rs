//! Background host that keeps playback alive without a UI.
//!
//! The host owns an [`EngineHandle`](crate::playback::EngineHandle), renders
//! every state change onto its attached [`ControlSurface`]s and turns
//! external [`ControlSignal`]s (media keys, MPRIS clients) back into engine
//! commands.

use thiserror::Error;

use crate::library::Track;

mod host;
mod mpris;
mod surface;

pub use host::{HostExit, SessionHost};
pub use mpris::MprisSurface;
pub use surface::{ControlSurface, SurfaceView};

/// Signals coming from an external control surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSignal {
    Play,
    Pause,
    PlayPause,
    Next,
    Prev,
    /// Absolute position in milliseconds.
    Seek(u64),
    /// Relative move in milliseconds.
    SeekBy(i64),
    /// Media-key scrub by the configured seek step.
    SkipForward,
    SkipBackward,
    Stop,
    Quit,
    /// The surface itself was activated ("tapped").
    Raise,
    OpenUri(String),
    SetRepeatOne(bool),
    ToggleRepeatOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOrigin {
    SurfaceTap,
    ExternalOpen,
}

/// A request for the UI to show `track`. Delivered at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationIntent {
    pub track: Track,
    pub origin: NavigationOrigin,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session bus error: {0}")]
    Bus(#[from] zbus::Error),

    #[error("failed to start the bus thread: {0}")]
    Thread(#[source] std::io::Error),

    #[error("bus thread exited before the surface was registered")]
    BusThreadExited,
}

#[cfg(test)]
mod tests;
