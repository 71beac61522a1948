//! Playback engine: the single owner of the active track, play state,
//! position and queue.
//!
//! Callers hold an [`EngineHandle`] and talk to the engine thread through
//! commands; state comes back as [`PlaybackSnapshot`]s on a latest-value
//! channel, and open failures as [`PlaybackFailure`] events.

mod engine;
mod handle;
mod queue;
mod types;

pub use handle::EngineHandle;
pub use queue::Queue;
pub use types::{Command, PlayStatus, PlaybackFailure, PlaybackSnapshot};
