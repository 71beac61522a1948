//! Commands, published snapshots and failure events of the playback engine.

use std::sync::mpsc::Sender;

use crate::library::Track;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlayStatus {
    /// Nothing open. A queue may still be installed.
    #[default]
    Idle,
    /// A handle is open and paused.
    Paused,
    Playing,
}

/// Immutable copy of the engine state, published after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackSnapshot {
    pub track: Option<Track>,
    pub status: PlayStatus,
    pub position_ms: u64,
    /// Position captured on pause; resume seeks here.
    pub last_known_position_ms: u64,
    pub duration_ms: Option<u64>,
    pub repeat_one: bool,
    pub cursor: Option<usize>,
    pub queue_len: usize,
    /// Changes every time a new queue is installed.
    pub queue_generation: u64,
}

impl PlaybackSnapshot {
    pub fn is_playing(&self) -> bool {
        self.status == PlayStatus::Playing
    }

    pub fn is_loaded(&self) -> bool {
        self.status != PlayStatus::Idle
    }
}

#[derive(Debug)]
pub enum Command {
    /// Play `track` with `queue` as the new playback context.
    PlayTrack { track: Track, queue: Vec<Track> },
    /// Resume if paused, start the cursor track if idle.
    Play,
    Pause,
    Resume,
    TogglePlayPause,
    Next,
    Previous,
    /// Absolute seek in milliseconds.
    Seek(u64),
    /// Relative seek in milliseconds.
    SeekBy(i64),
    /// Relative seek by the configured step.
    SkipForward,
    SkipBackward,
    ToggleRepeatOne,
    SetRepeatOne(bool),
    Stop,
    /// Install a queue without opening anything.
    LoadQueue {
        tracks: Vec<Track>,
        cursor: Option<usize>,
    },
    /// Reply once every earlier command has been applied.
    Sync(Sender<()>),
    Shutdown,
}

/// A track that could not be opened. The engine is `Idle` afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackFailure {
    pub track: Track,
    pub reason: String,
}
