use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::SessionSettings;
use crate::library::{Library, Track, file_locator};
use crate::playback::{EngineHandle, PlaybackFailure, PlaybackSnapshot, Queue};
use crate::store::LibraryStore;
use crate::sync::{EventSlot, StateSubscriber};

use super::surface::{ControlSurface, SurfaceView};
use super::{ControlSignal, NavigationIntent, NavigationOrigin};

/// How often the host re-renders position updates while waiting for signals.
const REFRESH: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostExit {
    /// An explicit quit request.
    Quit,
    /// Nothing was loaded and no command arrived in time.
    Idle,
    /// Every signal sender is gone and nothing is playing.
    Disconnected,
}

pub struct SessionHost {
    engine: EngineHandle,
    state: StateSubscriber<PlaybackSnapshot>,
    failures: EventSlot<PlaybackFailure>,
    library: Arc<Library>,
    store: Option<Arc<dyn LibraryStore>>,
    surfaces: Vec<Box<dyn ControlSurface>>,
    /// Last queue the host asked for, used to re-seed a fresh engine.
    mirror: Queue,
    /// Engine queue generation that matches `mirror`, once known.
    mirror_generation: Option<u64>,
    /// A queue install was sent and its generation is not recorded yet.
    pending_install: bool,
    notice: Option<String>,
    navigation: EventSlot<NavigationIntent>,
    last_view: Option<SurfaceView>,
    idle_exit: Option<Duration>,
}

impl SessionHost {
    pub fn new(engine: EngineHandle, library: Arc<Library>, settings: &SessionSettings) -> Self {
        let state = engine.subscribe();
        let failures = engine.failures();
        Self {
            engine,
            state,
            failures,
            library,
            store: None,
            surfaces: Vec::new(),
            mirror: Queue::default(),
            mirror_generation: None,
            pending_install: false,
            notice: None,
            navigation: EventSlot::new(),
            last_view: None,
            idle_exit: (settings.idle_exit_ms > 0)
                .then(|| Duration::from_millis(settings.idle_exit_ms)),
        }
    }

    /// Read liked state for the current track from `store`.
    pub fn with_store(mut self, store: Arc<dyn LibraryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attach a surface and bring it up to date immediately.
    pub fn attach_surface(&mut self, surface: Box<dyn ControlSurface>) {
        let snapshot = self.state.latest();
        let view = self.view_of(&snapshot);
        surface.render(&view);
        self.surfaces.push(surface);
    }

    /// Where navigation intents are delivered.
    pub fn navigation(&self) -> EventSlot<NavigationIntent> {
        self.navigation.clone()
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn mirror(&self) -> &Queue {
        &self.mirror
    }

    /// The view most recently pushed to the surfaces.
    pub fn view(&self) -> Option<&SurfaceView> {
        self.last_view.as_ref()
    }

    /// Play `track` with `tracks` as its queue.
    pub fn load(&mut self, tracks: Vec<Track>, track: Track) {
        self.start(tracks, track);
        self.settle();
    }

    /// Install `tracks` without playing; the next Play starts at `cursor`.
    pub fn cue(&mut self, tracks: Vec<Track>, cursor: Option<usize>) {
        self.mirror = Queue::new(tracks, cursor);
        self.reseed();
        self.settle();
    }

    /// Swap in a fresh engine, shutting down the old one, and seed it with
    /// the mirrored queue.
    pub fn replace_engine(&mut self, engine: EngineHandle) {
        self.engine.shutdown();
        self.state = engine.subscribe();
        self.failures = engine.failures();
        self.engine = engine;
        self.reseed();
        self.settle();
    }

    /// Apply one external signal. Surfaces are up to date when this returns.
    pub fn handle(&mut self, signal: ControlSignal) -> Option<HostExit> {
        debug!(?signal, "control signal");
        self.notice = None;
        match signal {
            ControlSignal::Play => self.engine.play(),
            ControlSignal::Pause => self.engine.pause(),
            ControlSignal::PlayPause => self.engine.toggle_play_pause(),
            ControlSignal::Next => self.engine.next(),
            ControlSignal::Prev => self.engine.previous(),
            ControlSignal::Seek(ms) => self.engine.seek(ms),
            ControlSignal::SeekBy(delta) => self.engine.seek_by(delta),
            ControlSignal::SkipForward => self.engine.skip_forward(),
            ControlSignal::SkipBackward => self.engine.skip_backward(),
            ControlSignal::Stop => self.engine.stop(),
            ControlSignal::SetRepeatOne(on) => self.engine.set_repeat_one(on),
            ControlSignal::ToggleRepeatOne => self.engine.toggle_repeat_one(),
            ControlSignal::Raise => self.announce_current(),
            ControlSignal::OpenUri(uri) => self.open_uri(&uri),
            ControlSignal::Quit => {
                self.engine.stop();
                self.settle();
                info!("quit requested");
                return Some(HostExit::Quit);
            }
        }
        self.settle();
        None
    }

    /// Render pending engine updates. Returns whether surfaces were updated.
    pub fn refresh(&mut self) -> bool {
        let failed = self.take_failure();
        match self.state.take_if_changed() {
            Some(snapshot) => {
                self.follow_cursor(&snapshot);
                self.render(&snapshot)
            }
            None if failed => {
                let snapshot = self.state.latest();
                self.render(&snapshot)
            }
            None => false,
        }
    }

    /// Serve `signals` until quit, idle exit or disconnection.
    pub fn run(&mut self, signals: &Receiver<ControlSignal>) -> HostExit {
        info!("session host running");
        let mut connected = true;
        let mut idle_since = Some(Instant::now());

        loop {
            if connected {
                match signals.recv_timeout(REFRESH) {
                    Ok(signal) => {
                        idle_since = None;
                        if let Some(exit) = self.handle(signal) {
                            return exit;
                        }
                        continue;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        debug!("all control signal senders are gone");
                        connected = false;
                    }
                }
            } else {
                thread::sleep(REFRESH);
            }

            self.refresh();
            if self.state.latest().track.is_some() {
                idle_since = None;
                continue;
            }
            if !connected {
                return HostExit::Disconnected;
            }
            let since = *idle_since.get_or_insert_with(Instant::now);
            if let Some(limit) = self.idle_exit {
                if since.elapsed() >= limit {
                    info!(idle_ms = limit.as_millis() as u64, "nothing loaded, exiting");
                    return HostExit::Idle;
                }
            }
        }
    }

    /// Release the engine and clear every surface.
    pub fn shutdown(&mut self) {
        self.engine.shutdown();
        for surface in self.surfaces.drain(..) {
            surface.clear();
        }
        info!("session host stopped");
    }

    fn start(&mut self, tracks: Vec<Track>, track: Track) {
        self.mirror.replace(tracks, &track);
        self.engine.play_track(track, self.mirror.tracks().to_vec());
        self.pending_install = true;
    }

    fn reseed(&mut self) {
        self.mirror_generation = None;
        self.pending_install = !self.mirror.is_empty();
        if self.pending_install {
            self.engine
                .load_queue(self.mirror.tracks().to_vec(), self.mirror.cursor());
        }
    }

    fn announce_current(&self) {
        match self.engine.snapshot().track {
            Some(track) => {
                self.navigation.emit(NavigationIntent {
                    track,
                    origin: NavigationOrigin::SurfaceTap,
                });
            }
            None => debug!("surface tapped with nothing loaded"),
        }
    }

    fn open_uri(&mut self, uri: &str) {
        let locator = if uri.contains("://") {
            Some(uri.to_string())
        } else {
            file_locator(Path::new(uri))
        };
        let Some(track) = locator.and_then(|l| self.library.by_locator(&l).cloned()) else {
            warn!(%uri, "open request for a track outside the catalog");
            return;
        };
        self.start(self.library.tracks().to_vec(), track.clone());
        self.navigation.emit(NavigationIntent {
            track,
            origin: NavigationOrigin::ExternalOpen,
        });
    }

    /// Wait for the engine to apply everything sent so far, then render.
    fn settle(&mut self) {
        if !self.engine.sync() {
            warn!("playback engine is gone");
        }
        self.take_failure();
        let snapshot = self
            .state
            .take_if_changed()
            .unwrap_or_else(|| self.state.latest());
        if std::mem::take(&mut self.pending_install) {
            self.mirror_generation = Some(snapshot.queue_generation);
        }
        self.follow_cursor(&snapshot);
        self.render(&snapshot);
    }

    /// Turn a pending playback failure into a notice for the surfaces.
    fn take_failure(&mut self) -> bool {
        let Some(failure) = self.failures.try_take() else {
            return false;
        };
        warn!(
            locator = %failure.track.locator,
            reason = %failure.reason,
            "playback failed"
        );
        self.notice = Some(format!(
            "Could not play {}: {}",
            failure.track.title, failure.reason
        ));
        true
    }

    /// Keep the mirror cursor on the engine's cursor while the engine still
    /// holds the queue the mirror was built from.
    fn follow_cursor(&mut self, snapshot: &PlaybackSnapshot) {
        if self.mirror_generation != Some(snapshot.queue_generation) {
            return;
        }
        if let Some(cursor) = snapshot.cursor {
            self.mirror.set_cursor(cursor);
        }
    }

    fn render(&mut self, snapshot: &PlaybackSnapshot) -> bool {
        let view = self.view_of(snapshot);
        if self.last_view.as_ref() == Some(&view) {
            return false;
        }
        for surface in &self.surfaces {
            surface.render(&view);
        }
        self.last_view = Some(view);
        true
    }

    fn view_of(&self, snapshot: &PlaybackSnapshot) -> SurfaceView {
        let liked = match (&self.store, &snapshot.track) {
            (Some(store), Some(track)) => store.is_liked(&track.locator).unwrap_or_else(|e| {
                warn!(error = %e, "could not read liked state");
                false
            }),
            _ => false,
        };
        SurfaceView {
            notice: self.notice.clone(),
            ..SurfaceView::from_snapshot(snapshot, liked)
        }
    }
}
