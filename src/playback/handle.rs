use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use crate::audio::{AudioTransport, TransportError};
use crate::config::PlaybackSettings;
use crate::library::Track;
use crate::sync::{EventSlot, StateSubscriber};

use super::engine::{Engine, run};
use super::types::{Command, PlaybackFailure, PlaybackSnapshot};

/// Cloneable handle to the engine thread.
///
/// Every method enqueues a command and returns immediately; the engine applies
/// commands in arrival order. Use [`EngineHandle::sync`] to wait until
/// everything sent so far has been applied and published.
#[derive(Clone)]
pub struct EngineHandle {
    tx: Sender<Command>,
    state: StateSubscriber<PlaybackSnapshot>,
    failures: EventSlot<PlaybackFailure>,
    join: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EngineHandle {
    /// Start the engine thread. The transport is built on that thread, since
    /// output streams are usually tied to the thread that opened them.
    pub fn spawn<T, F>(make_transport: F, settings: &PlaybackSettings) -> Result<Self, TransportError>
    where
        T: AudioTransport + 'static,
        F: FnOnce() -> Result<T, TransportError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let poll = Duration::from_millis(settings.position_poll_ms);
        let repeat_one = settings.repeat_one;
        let seek_step_ms = settings.seek_step_ms;

        let join = thread::Builder::new()
            .name("reprise-engine".to_string())
            .spawn(move || {
                let transport = match make_transport() {
                    Ok(t) => t,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let engine = Engine::new(transport, repeat_one).with_seek_step(seek_step_ms);
                let _ = ready_tx.send(Ok((engine.subscribe(), engine.failures())));
                run(engine, rx, poll);
            })
            .map_err(TransportError::Thread)?;

        let (state, failures) = match ready_rx.recv() {
            Ok(Ok(channels)) => channels,
            Ok(Err(e)) => {
                let _ = join.join();
                return Err(e);
            }
            Err(_) => {
                let _ = join.join();
                return Err(TransportError::Thread(std::io::Error::other(
                    "engine thread exited during startup",
                )));
            }
        };
        info!(poll_ms = poll.as_millis() as u64, "playback engine started");

        Ok(Self {
            tx,
            state,
            failures,
            join: Arc::new(Mutex::new(Some(join))),
        })
    }

    fn send(&self, cmd: Command) {
        if let Err(mpsc::SendError(cmd)) = self.tx.send(cmd) {
            warn!(?cmd, "playback engine is gone; command dropped");
        }
    }

    pub fn play_track(&self, track: Track, queue: Vec<Track>) {
        self.send(Command::PlayTrack { track, queue });
    }

    pub fn play(&self) {
        self.send(Command::Play);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn toggle_play_pause(&self) {
        self.send(Command::TogglePlayPause);
    }

    pub fn next(&self) {
        self.send(Command::Next);
    }

    pub fn previous(&self) {
        self.send(Command::Previous);
    }

    pub fn seek(&self, position_ms: u64) {
        self.send(Command::Seek(position_ms));
    }

    pub fn seek_by(&self, delta_ms: i64) {
        self.send(Command::SeekBy(delta_ms));
    }

    pub fn skip_forward(&self) {
        self.send(Command::SkipForward);
    }

    pub fn skip_backward(&self) {
        self.send(Command::SkipBackward);
    }

    pub fn toggle_repeat_one(&self) {
        self.send(Command::ToggleRepeatOne);
    }

    pub fn set_repeat_one(&self, on: bool) {
        self.send(Command::SetRepeatOne(on));
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    pub fn load_queue(&self, tracks: Vec<Track>, cursor: Option<usize>) {
        self.send(Command::LoadQueue { tracks, cursor });
    }

    /// Block until every command sent before this call was applied.
    /// Returns `false` if the engine is gone.
    pub fn sync(&self) -> bool {
        let (tx, rx) = mpsc::channel();
        if self.tx.send(Command::Sync(tx)).is_err() {
            return false;
        }
        rx.recv().is_ok()
    }

    /// A new subscriber that first sees the latest snapshot.
    pub fn subscribe(&self) -> StateSubscriber<PlaybackSnapshot> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.latest()
    }

    pub fn failures(&self) -> EventSlot<PlaybackFailure> {
        self.failures.clone()
    }

    /// Release the transport and join the engine thread. Safe to call more
    /// than once and from any clone.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
        let join = self
            .join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(join) = join {
            if join.join().is_err() {
                warn!("playback engine thread panicked");
            }
        }
    }
}
