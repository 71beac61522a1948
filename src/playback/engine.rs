//! The playback state machine and the thread that drains its command queue.
//!
//! [`Engine`] owns the transport, the queue and every piece of playback
//! state. It is a plain synchronous struct; [`run`] drives it from a single
//! thread so all mutation is serialized through the command channel.

use std::ops::ControlFlow;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio::AudioTransport;
use crate::library::Track;
use crate::sync::{EventSlot, StatePublisher, StateSubscriber, state_channel};

use super::queue::Queue;
use super::types::{Command, PlayStatus, PlaybackFailure, PlaybackSnapshot};

pub struct Engine<T: AudioTransport> {
    transport: T,
    queue: Queue,
    track: Option<Track>,
    status: PlayStatus,
    position_ms: u64,
    last_known_position_ms: u64,
    repeat_one: bool,
    seek_step_ms: u64,
    /// Bumped whenever a queue is installed.
    queue_generation: u64,
    publisher: StatePublisher<PlaybackSnapshot>,
    published: PlaybackSnapshot,
    failures: EventSlot<PlaybackFailure>,
}

impl<T: AudioTransport> Engine<T> {
    pub fn new(transport: T, repeat_one: bool) -> Self {
        let published = PlaybackSnapshot {
            repeat_one,
            ..PlaybackSnapshot::default()
        };
        let (publisher, _) = state_channel(published.clone());
        Self {
            transport,
            queue: Queue::default(),
            track: None,
            status: PlayStatus::Idle,
            position_ms: 0,
            last_known_position_ms: 0,
            repeat_one,
            seek_step_ms: 5_000,
            queue_generation: 0,
            publisher,
            published,
            failures: EventSlot::new(),
        }
    }

    /// Step used by [`Command::SkipForward`] and [`Command::SkipBackward`].
    pub fn with_seek_step(mut self, step_ms: u64) -> Self {
        self.seek_step_ms = step_ms;
        self
    }

    pub fn subscribe(&self) -> StateSubscriber<PlaybackSnapshot> {
        self.publisher.subscribe()
    }

    pub fn failures(&self) -> EventSlot<PlaybackFailure> {
        self.failures.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlayStatus::Playing
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let duration_ms = match &self.track {
            Some(track) => self.transport.duration().or_else(|| track.duration_ms()),
            None => None,
        };
        PlaybackSnapshot {
            track: self.track.clone(),
            status: self.status,
            position_ms: self.position_ms,
            last_known_position_ms: self.last_known_position_ms,
            duration_ms,
            repeat_one: self.repeat_one,
            cursor: self.queue.cursor(),
            queue_len: self.queue.len(),
            queue_generation: self.queue_generation,
        }
    }

    /// Publish the current state if it differs from the last published one.
    pub fn publish(&mut self) {
        let snapshot = self.snapshot();
        if snapshot != self.published {
            self.published = snapshot.clone();
            self.publisher.publish(snapshot);
        }
    }

    /// Apply one command and publish the result.
    pub fn apply(&mut self, cmd: Command) -> ControlFlow<()> {
        let mut reply: Option<Sender<()>> = None;
        match cmd {
            Command::PlayTrack { track, queue } => self.play_track(track, queue),
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::TogglePlayPause => self.toggle_play_pause(),
            Command::Next => self.step(true),
            Command::Previous => self.step(false),
            Command::Seek(ms) => self.seek(ms),
            Command::SeekBy(delta) => self.seek_by(delta),
            Command::SkipForward => self.seek_by(self.step_delta()),
            Command::SkipBackward => self.seek_by(-self.step_delta()),
            Command::ToggleRepeatOne => self.set_repeat_one(!self.repeat_one),
            Command::SetRepeatOne(on) => self.set_repeat_one(on),
            Command::Stop => self.stop(),
            Command::LoadQueue { tracks, cursor } => self.load_queue(tracks, cursor),
            Command::Sync(tx) => reply = Some(tx),
            Command::Shutdown => {
                self.shutdown();
                return ControlFlow::Break(());
            }
        }
        self.publish();
        if let Some(tx) = reply {
            let _ = tx.send(());
        }
        ControlFlow::Continue(())
    }

    /// Consume a pending completion from the transport, if any.
    pub fn poll_completion(&mut self) -> bool {
        if self.status != PlayStatus::Playing || !self.transport.take_completion() {
            return false;
        }
        self.on_completion();
        true
    }

    /// Periodic work while playing.
    pub fn tick(&mut self) {
        self.poll_completion();
        if self.status == PlayStatus::Playing {
            self.position_ms = self.transport.position();
        }
        self.publish();
    }

    /// Open `track` with `queue` as its context. If `track` is already open
    /// the handle is kept: the queue is still installed, a paused track
    /// resumes and a playing one carries on.
    pub fn play_track(&mut self, track: Track, queue: Vec<Track>) {
        let is_current = self.track.as_ref() == Some(&track) && self.transport.is_open();
        self.queue.replace(queue, &track);
        self.queue_generation += 1;
        if !is_current {
            self.start_track(track);
            return;
        }
        match self.status {
            PlayStatus::Paused => self.resume(),
            PlayStatus::Playing => debug!(track = %track.title, "already playing"),
            PlayStatus::Idle => {}
        }
    }

    /// Resume when paused, start the cursor track when idle.
    pub fn play(&mut self) {
        match self.status {
            PlayStatus::Playing => {}
            PlayStatus::Paused => self.resume(),
            PlayStatus::Idle => self.start_queued(),
        }
    }

    pub fn pause(&mut self) {
        if self.status != PlayStatus::Playing {
            return;
        }
        let position = self.transport.position();
        self.transport.pause();
        self.last_known_position_ms = position;
        self.position_ms = position;
        self.status = PlayStatus::Paused;
        debug!(position_ms = position, "paused");
    }

    pub fn resume(&mut self) {
        if self.status != PlayStatus::Paused {
            return;
        }
        self.transport.seek(self.last_known_position_ms);
        self.transport.resume();
        self.position_ms = self.last_known_position_ms;
        self.status = PlayStatus::Playing;
        debug!(position_ms = self.position_ms, "resumed");
    }

    pub fn toggle_play_pause(&mut self) {
        match self.status {
            PlayStatus::Playing => self.pause(),
            PlayStatus::Paused => self.resume(),
            PlayStatus::Idle => self.start_queued(),
        }
    }

    /// Circular next/previous within the current queue.
    pub fn step(&mut self, forward: bool) {
        let next = if forward {
            self.queue.advance()
        } else {
            self.queue.retreat()
        };
        let Some(next) = next.cloned() else {
            debug!("queue is empty");
            return;
        };
        if self.track.as_ref() == Some(&next) && self.transport.is_open() {
            self.restart_current();
        } else {
            self.start_track(next);
        }
    }

    pub fn seek(&mut self, position_ms: u64) {
        if self.status == PlayStatus::Idle {
            return;
        }
        let duration = self
            .transport
            .duration()
            .or_else(|| self.track.as_ref().and_then(Track::duration_ms));
        let target = match duration {
            Some(d) => position_ms.min(d),
            None => position_ms,
        };
        self.transport.seek(target);
        self.last_known_position_ms = target;
        self.position_ms = target;
        debug!(position_ms = target, "seeked");
    }

    pub fn seek_by(&mut self, delta_ms: i64) {
        let base = match self.status {
            PlayStatus::Idle => return,
            PlayStatus::Paused => self.last_known_position_ms,
            PlayStatus::Playing => self.transport.position(),
        };
        self.seek(base.saturating_add_signed(delta_ms));
    }

    pub fn set_repeat_one(&mut self, on: bool) {
        self.repeat_one = on;
    }

    /// Release the handle and go idle. The queue and repeat flag survive.
    pub fn stop(&mut self) {
        self.transport.release();
        self.clear_track();
        debug!("stopped");
    }

    /// Install a queue without touching what is open.
    pub fn load_queue(&mut self, tracks: Vec<Track>, cursor: Option<usize>) {
        self.queue = Queue::new(tracks, cursor);
        self.queue_generation += 1;
        debug!(len = self.queue.len(), cursor = ?self.queue.cursor(), "queue loaded");
    }

    pub fn shutdown(&mut self) {
        self.transport.release();
        self.clear_track();
        self.publish();
        info!("playback engine stopped");
    }

    fn step_delta(&self) -> i64 {
        i64::try_from(self.seek_step_ms).unwrap_or(i64::MAX)
    }

    /// Open the cursor track, or the head of the queue if there is no cursor.
    fn start_queued(&mut self) {
        let next = match self.queue.current() {
            Some(track) => Some(track.clone()),
            None => self.queue.advance().cloned(),
        };
        match next {
            Some(track) => self.start_track(track),
            None => debug!("nothing queued to play"),
        }
    }

    fn on_completion(&mut self) {
        if self.repeat_one {
            self.restart_current();
            return;
        }
        match self.queue.advance().cloned() {
            Some(next) => self.start_track(next),
            None => self.stop(),
        }
    }

    fn restart_current(&mut self) {
        self.transport.seek(0);
        self.transport.resume();
        self.last_known_position_ms = 0;
        self.position_ms = 0;
        self.status = PlayStatus::Playing;
    }

    fn start_track(&mut self, track: Track) {
        self.transport.release();
        match self.transport.open(&track.locator) {
            Ok(()) => {
                self.transport.start();
                self.last_known_position_ms = 0;
                self.position_ms = 0;
                self.status = PlayStatus::Playing;
                info!(track = %track.title, artist = %track.artist, "playing");
                self.track = Some(track);
            }
            Err(e) => {
                warn!(locator = %track.locator, error = %e, "could not open track");
                self.clear_track();
                self.failures.emit(PlaybackFailure {
                    track,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn clear_track(&mut self) {
        self.track = None;
        self.status = PlayStatus::Idle;
        self.position_ms = 0;
        self.last_known_position_ms = 0;
    }
}

/// Drain `rx` until shutdown or until every sender is gone.
///
/// While playing, the loop wakes every `poll` to sample the position and
/// check for completion; otherwise it blocks on the next command.
pub fn run<T: AudioTransport>(mut engine: Engine<T>, rx: Receiver<Command>, poll: Duration) {
    loop {
        let next = if engine.is_playing() {
            rx.recv_timeout(poll)
        } else {
            rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        };
        match next {
            Ok(cmd) => {
                engine.poll_completion();
                if engine.apply(cmd).is_break() {
                    return;
                }
            }
            Err(RecvTimeoutError::Timeout) => engine.tick(),
            Err(RecvTimeoutError::Disconnected) => {
                engine.shutdown();
                return;
            }
        }
    }
}
