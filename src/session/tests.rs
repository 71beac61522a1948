use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::*;
use crate::audio::scripted::ScriptedTransport;
use crate::config::{PlaybackSettings, SessionSettings};
use crate::library::Library;
use crate::playback::{EngineHandle, PlayStatus};
use crate::store::{FileStore, LibraryStore};

#[derive(Clone, Default)]
struct Recorder {
    views: Arc<Mutex<Vec<SurfaceView>>>,
    cleared: Arc<AtomicBool>,
}

impl Recorder {
    fn last(&self) -> SurfaceView {
        self.views.lock().unwrap().last().cloned().unwrap()
    }

    fn count(&self) -> usize {
        self.views.lock().unwrap().len()
    }
}

impl ControlSurface for Recorder {
    fn render(&self, view: &SurfaceView) {
        self.views.lock().unwrap().push(view.clone());
    }

    fn clear(&self) {
        self.cleared.store(true, Ordering::SeqCst);
    }
}

fn catalog() -> Vec<Track> {
    vec![
        Track::new(1, "A", "Artist", "file:///m/a.mp3"),
        Track::new(2, "B", "Artist", "file:///m/b.mp3"),
        Track::new(3, "C", "Other", "file:///m/c.mp3"),
    ]
}

fn script() -> ScriptedTransport {
    ScriptedTransport::default()
        .with_track("file:///m/a.mp3", 5_000)
        .with_track("file:///m/b.mp3", 3_000)
        .with_track("file:///m/c.mp3", 4_000)
}

fn engine(script: &ScriptedTransport) -> EngineHandle {
    let transport = script.clone();
    let settings = PlaybackSettings {
        position_poll_ms: 10,
        ..PlaybackSettings::default()
    };
    EngineHandle::spawn(move || Ok(transport), &settings).unwrap()
}

fn host_with(script: &ScriptedTransport, idle_exit_ms: u64) -> (SessionHost, Recorder) {
    let settings = SessionSettings {
        idle_exit_ms,
        ..SessionSettings::default()
    };
    let library = Arc::new(Library::new(catalog()));
    let mut host = SessionHost::new(engine(script), library, &settings);
    let recorder = Recorder::default();
    host.attach_surface(Box::new(recorder.clone()));
    (host, recorder)
}

fn title(view: &SurfaceView) -> Option<&str> {
    view.title.as_deref()
}

#[test]
fn attached_surface_is_rendered_immediately() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 0);
    assert_eq!(recorder.count(), 1);
    assert!(!recorder.last().can_play);
    host.shutdown();
}

#[test]
fn load_renders_synchronously() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 0);
    let tracks = catalog();

    host.load(tracks.clone(), tracks[1].clone());
    let view = recorder.last();
    assert_eq!(title(&view), Some("B"));
    assert!(view.is_playing());
    assert!(view.can_pause && view.can_go_next && view.can_seek);
    assert_eq!(view.duration_ms, Some(3_000));
    assert_eq!(host.mirror().cursor(), Some(1));
    host.shutdown();
}

#[test]
fn signals_route_into_engine_and_mirror_follows() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 0);
    let tracks = catalog();
    host.load(tracks.clone(), tracks[0].clone());

    assert_eq!(host.handle(ControlSignal::Pause), None);
    assert_eq!(recorder.last().status, PlayStatus::Paused);
    host.handle(ControlSignal::Play);
    assert!(recorder.last().is_playing());

    host.handle(ControlSignal::Prev);
    assert_eq!(title(&recorder.last()), Some("C"));
    assert_eq!(host.mirror().cursor(), Some(2));

    host.handle(ControlSignal::Next);
    assert_eq!(title(&recorder.last()), Some("A"));
    assert_eq!(host.mirror().cursor(), Some(0));

    host.handle(ControlSignal::ToggleRepeatOne);
    assert!(recorder.last().repeat_one);
    host.handle(ControlSignal::SetRepeatOne(false));
    assert!(!recorder.last().repeat_one);
    host.shutdown();
}

#[test]
fn play_from_idle_starts_mirrored_track() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 0);
    host.cue(catalog(), Some(1));
    assert_eq!(recorder.last().status, PlayStatus::Idle);
    assert!(recorder.last().can_play);

    host.handle(ControlSignal::PlayPause);
    assert_eq!(title(&recorder.last()), Some("B"));
    host.handle(ControlSignal::PlayPause);
    assert_eq!(recorder.last().status, PlayStatus::Paused);

    host.handle(ControlSignal::Stop);
    assert_eq!(recorder.last().status, PlayStatus::Idle);
    host.handle(ControlSignal::Play);
    assert_eq!(title(&recorder.last()), Some("B"));
    assert_eq!(script.opens().len(), 2);
    host.shutdown();
}

#[test]
fn seek_signals_are_clamped() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 0);
    let tracks = catalog();
    host.load(tracks.clone(), tracks[0].clone());

    host.handle(ControlSignal::Seek(2_000));
    assert_eq!(recorder.last().position_ms, 2_000);
    host.handle(ControlSignal::SeekBy(-5_000));
    assert_eq!(recorder.last().position_ms, 0);
    host.handle(ControlSignal::Seek(60_000));
    assert_eq!(recorder.last().position_ms, 5_000);
    host.shutdown();
}

#[test]
fn raise_emits_one_navigation_intent() {
    let script = script();
    let (mut host, _recorder) = host_with(&script, 0);
    let navigation = host.navigation();

    host.handle(ControlSignal::Raise);
    assert_eq!(navigation.try_take(), None);

    let tracks = catalog();
    host.load(tracks.clone(), tracks[2].clone());
    host.handle(ControlSignal::Raise);
    host.handle(ControlSignal::Raise);

    assert_eq!(
        navigation.try_take(),
        Some(NavigationIntent {
            track: tracks[2].clone(),
            origin: NavigationOrigin::SurfaceTap,
        })
    );
    assert_eq!(navigation.try_take(), None);
    host.shutdown();
}

#[test]
fn open_uri_plays_catalog_track_and_announces_it() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 0);
    let navigation = host.navigation();

    host.handle(ControlSignal::OpenUri("file:///m/nowhere.mp3".into()));
    assert_eq!(navigation.try_take(), None);
    assert!(script.opens().is_empty());

    host.handle(ControlSignal::OpenUri("/m/c.mp3".into()));
    assert_eq!(title(&recorder.last()), Some("C"));
    assert_eq!(host.mirror().len(), 3);
    assert_eq!(host.mirror().cursor(), Some(2));

    let intent = navigation.try_take().unwrap();
    assert_eq!(intent.track.title, "C");
    assert_eq!(intent.origin, NavigationOrigin::ExternalOpen);
    host.shutdown();
}

#[test]
fn view_carries_liked_state() {
    let script = script();
    let (host, recorder) = host_with(&script, 0);
    let store = Arc::new(FileStore::in_memory());
    store.set_liked("file:///m/b.mp3", true).unwrap();
    let mut host = host.with_store(store);

    let tracks = catalog();
    host.load(tracks.clone(), tracks[0].clone());
    assert!(!recorder.last().liked);
    host.handle(ControlSignal::Next);
    assert!(recorder.last().liked);
    host.shutdown();
}

#[test]
fn completion_is_rendered_on_refresh() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 0);
    let tracks = catalog();
    host.load(tracks.clone(), tracks[0].clone());

    script.finish();
    assert!(host.engine().sync());
    assert!(host.refresh());
    let view = recorder.last();
    assert_eq!(title(&view), Some("B"));
    assert_eq!(view.position_ms, 0);
    assert_eq!(host.mirror().cursor(), Some(1));
    assert!(!host.refresh());
    host.shutdown();
}

#[test]
fn quit_stops_playback() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 0);
    let tracks = catalog();
    host.load(tracks.clone(), tracks[0].clone());

    assert_eq!(host.handle(ControlSignal::Quit), Some(HostExit::Quit));
    assert_eq!(recorder.last().status, PlayStatus::Idle);
    assert!(script.state().open.is_none());
    host.shutdown();
}

#[test]
fn run_exits_when_idle() {
    let script = script();
    let (mut host, _recorder) = host_with(&script, 100);
    let (_tx, rx) = mpsc::channel::<ControlSignal>();

    let started = Instant::now();
    assert_eq!(host.run(&rx), HostExit::Idle);
    assert!(started.elapsed() >= Duration::from_millis(100));
    host.shutdown();
}

#[test]
fn run_keeps_going_while_a_track_is_loaded() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 50);
    let tracks = catalog();
    host.load(tracks.clone(), tracks[0].clone());

    let (tx, rx) = mpsc::channel::<ControlSignal>();
    let sender = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(300));
        tx.send(ControlSignal::Quit).unwrap();
    });

    assert_eq!(host.run(&rx), HostExit::Quit);
    sender.join().unwrap();
    assert_eq!(recorder.last().status, PlayStatus::Idle);
    host.shutdown();
}

#[test]
fn run_ends_when_senders_are_gone_and_nothing_plays() {
    let script = script();
    let (mut host, _recorder) = host_with(&script, 0);
    let (tx, rx) = mpsc::channel::<ControlSignal>();
    drop(tx);
    assert_eq!(host.run(&rx), HostExit::Disconnected);
    host.shutdown();
}

#[test]
fn replaced_engine_is_seeded_from_mirror() {
    let first = script();
    let (mut host, recorder) = host_with(&first, 0);
    let tracks = catalog();
    host.load(tracks.clone(), tracks[1].clone());

    let second = script();
    host.replace_engine(engine(&second));
    assert!(first.state().open.is_none());

    let snapshot = host.engine().snapshot();
    assert_eq!(snapshot.status, PlayStatus::Idle);
    assert_eq!((snapshot.queue_len, snapshot.cursor), (3, Some(1)));
    assert_eq!(recorder.last().status, PlayStatus::Idle);

    host.handle(ControlSignal::Play);
    assert_eq!(title(&recorder.last()), Some("B"));
    assert_eq!(second.opens(), vec!["file:///m/b.mp3".to_string()]);
    host.shutdown();
}

#[test]
fn shutdown_releases_transport_and_clears_surfaces() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 0);
    let tracks = catalog();
    host.load(tracks.clone(), tracks[0].clone());

    host.shutdown();
    assert!(script.state().open.is_none());
    assert!(recorder.cleared.load(Ordering::SeqCst));
}

#[test]
fn play_pause_toggles_after_commands_still_in_flight() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 0);
    let tracks = catalog();
    host.load(tracks.clone(), tracks[0].clone());
    let ui = host.engine().clone();

    for _ in 0..50 {
        ui.pause();
        host.handle(ControlSignal::PlayPause);
        assert!(recorder.last().is_playing());
    }

    ui.pause();
    host.handle(ControlSignal::Play);
    assert!(recorder.last().is_playing());
    assert_eq!(script.opens().len(), 1);
    host.shutdown();
}

#[test]
fn reloading_the_playing_track_adopts_the_new_queue() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 0);
    let tracks = catalog();
    host.load(tracks.clone(), tracks[0].clone());
    host.load(vec![tracks[0].clone(), tracks[2].clone()], tracks[0].clone());

    assert_eq!(host.mirror().len(), 2);
    assert_eq!(host.engine().snapshot().queue_len, 2);

    host.handle(ControlSignal::Next);
    assert_eq!(title(&recorder.last()), Some("C"));
    assert_eq!(host.mirror().cursor(), Some(1));
    assert_eq!(
        script.opens(),
        vec!["file:///m/a.mp3".to_string(), "file:///m/c.mp3".to_string()]
    );
    host.shutdown();
}

#[test]
fn mirror_ignores_cursor_moves_in_another_queue() {
    let script = script();
    let (mut host, recorder) = host_with(&script, 0);
    let tracks = catalog();
    host.load(tracks.clone(), tracks[1].clone());
    assert_eq!(host.mirror().cursor(), Some(1));

    let ui = host.engine().clone();
    let reversed: Vec<Track> = tracks.iter().rev().cloned().collect();
    ui.play_track(tracks[2].clone(), reversed);
    assert!(ui.sync());

    assert!(host.refresh());
    assert_eq!(title(&recorder.last()), Some("C"));
    assert_eq!(host.mirror().cursor(), Some(1));
    host.shutdown();
}

#[test]
fn failed_track_reaches_surfaces_as_a_notice() {
    let script = script().failing("file:///m/b.mp3");
    let (mut host, recorder) = host_with(&script, 0);
    let tracks = catalog();
    host.load(tracks.clone(), tracks[0].clone());
    assert_eq!(recorder.last().notice, None);

    host.handle(ControlSignal::Next);
    let view = recorder.last();
    assert_eq!(view.status, PlayStatus::Idle);
    assert!(view.notice.as_deref().unwrap().starts_with("Could not play B"));

    host.handle(ControlSignal::Next);
    let view = recorder.last();
    assert_eq!(title(&view), Some("C"));
    assert_eq!(view.notice, None);
    host.shutdown();
}

#[test]
fn failure_on_completion_is_rendered_on_refresh() {
    let script = script().failing("file:///m/b.mp3");
    let (mut host, recorder) = host_with(&script, 0);
    let tracks = catalog();
    host.load(tracks.clone(), tracks[0].clone());

    script.finish();
    assert!(host.engine().sync());
    assert!(host.refresh());
    let view = recorder.last();
    assert_eq!(view.status, PlayStatus::Idle);
    assert!(view.notice.is_some());
    host.shutdown();
}

#[test]
fn skip_signals_use_the_configured_seek_step() {
    let script = script();
    let settings = PlaybackSettings {
        position_poll_ms: 10,
        seek_step_ms: 1_500,
        ..PlaybackSettings::default()
    };
    let transport = script.clone();
    let engine = EngineHandle::spawn(move || Ok(transport), &settings).unwrap();
    let library = Arc::new(Library::new(catalog()));
    let mut host = SessionHost::new(engine, library, &SessionSettings::default());
    let recorder = Recorder::default();
    host.attach_surface(Box::new(recorder.clone()));

    let tracks = catalog();
    host.load(tracks.clone(), tracks[0].clone());
    host.handle(ControlSignal::SkipForward);
    assert_eq!(recorder.last().position_ms, 1_500);
    host.handle(ControlSignal::SkipForward);
    assert_eq!(recorder.last().position_ms, 3_000);
    host.handle(ControlSignal::SkipBackward);
    assert_eq!(recorder.last().position_ms, 1_500);
    host.shutdown();
}
