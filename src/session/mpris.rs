//! MPRIS control surface on the D-Bus session bus.
//!
//! The bus objects live on their own thread running an `async-io` executor.
//! [`MprisSurface::render`] stores the latest view and wakes that thread,
//! which announces the changed properties to connected clients.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use async_io::block_on;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedValue, Value};

use crate::playback::PlayStatus;

use super::surface::{ControlSurface, SurfaceView};
use super::{ControlSignal, SessionError};

const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";
const NO_TRACK: &str = "/org/mpris/MediaPlayer2/TrackList/NoTrack";

#[derive(Debug, Default)]
struct SharedState {
    view: Mutex<SurfaceView>,
    closed: AtomicBool,
    changed: Notify,
}

impl SharedState {
    fn view(&self) -> MutexGuard<'_, SurfaceView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the bus thread. Dropping it releases the bus name.
pub struct MprisSurface {
    state: Arc<SharedState>,
}

impl MprisSurface {
    /// Connect to the session bus, claim `org.mpris.MediaPlayer2.<identity>`
    /// and route client requests into `tx`.
    pub fn spawn(identity: &str, tx: Sender<ControlSignal>) -> Result<Self, SessionError> {
        let state = Arc::new(SharedState::default());
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread_state = Arc::clone(&state);
        let identity = identity.to_string();
        thread::Builder::new()
            .name("reprise-mpris".to_string())
            .spawn(move || {
                block_on(async move {
                    let connection = match serve(&identity, tx, Arc::clone(&thread_state)).await {
                        Ok(c) => {
                            let _ = ready_tx.send(Ok(()));
                            c
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    announce_changes(&connection, &thread_state).await;
                    debug!("MPRIS thread finished");
                });
            })
            .map_err(SessionError::Thread)?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { state }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SessionError::BusThreadExited),
        }
    }
}

impl ControlSurface for MprisSurface {
    fn render(&self, view: &SurfaceView) {
        let announce = {
            let mut current = self.state.view();
            let announce = !current.same_apart_from_position(view);
            *current = view.clone();
            announce
        };
        // Clients poll Position themselves; only announce the rest.
        if announce {
            self.state.changed.notify_one();
        }
    }

    fn clear(&self) {
        *self.state.view() = SurfaceView::default();
        self.state.changed.notify_one();
    }
}

impl Drop for MprisSurface {
    fn drop(&mut self) {
        self.state.closed.store(true, Ordering::SeqCst);
        self.state.changed.notify_one();
    }
}

async fn serve(
    identity: &str,
    tx: Sender<ControlSignal>,
    state: Arc<SharedState>,
) -> Result<Connection, SessionError> {
    let connection = Connection::session().await?;
    let object_server = connection.object_server();

    object_server
        .at(
            MPRIS_PATH,
            RootIface {
                tx: tx.clone(),
                identity: identity.to_string(),
            },
        )
        .await?;
    object_server.at(MPRIS_PATH, PlayerIface { tx, state }).await?;

    connection
        .request_name(format!("org.mpris.MediaPlayer2.{identity}"))
        .await?;
    info!(%identity, "MPRIS surface registered");
    Ok(connection)
}

async fn announce_changes(connection: &Connection, state: &SharedState) {
    let iface_ref = match connection
        .object_server()
        .interface::<_, PlayerIface>(MPRIS_PATH)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "MPRIS player interface missing");
            return;
        }
    };

    loop {
        state.changed.notified().await;
        if state.closed.load(Ordering::SeqCst) {
            return;
        }

        let iface = iface_ref.get().await;
        let emitter = iface_ref.signal_emitter();
        let result = async {
            iface.playback_status_changed(emitter).await?;
            iface.loop_status_changed(emitter).await?;
            iface.metadata_changed(emitter).await?;
            iface.can_play_changed(emitter).await?;
            iface.can_pause_changed(emitter).await?;
            iface.can_go_next_changed(emitter).await?;
            iface.can_go_previous_changed(emitter).await?;
            iface.can_seek_changed(emitter).await?;
            Ok::<(), zbus::Error>(())
        }
        .await;
        if let Err(e) = result {
            warn!(error = %e, "failed to announce MPRIS property change");
        }
    }
}

struct RootIface {
    tx: Sender<ControlSignal>,
    identity: String,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        let _ = self.tx.send(ControlSignal::Raise);
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlSignal::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> String {
        self.identity.clone()
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        ["audio/mpeg", "audio/flac", "audio/x-wav", "audio/ogg"]
            .map(String::from)
            .to_vec()
    }
}

struct PlayerIface {
    tx: Sender<ControlSignal>,
    state: Arc<SharedState>,
}

impl PlayerIface {
    fn send(&self, signal: ControlSignal) {
        if self.tx.send(signal).is_err() {
            debug!("session host is gone; MPRIS request dropped");
        }
    }
}

fn owned<'a>(value: impl Into<Value<'a>>) -> Option<OwnedValue> {
    OwnedValue::try_from(value.into()).ok()
}

fn track_path(view: &SurfaceView) -> String {
    match view.track_id {
        Some(id) => format!("{MPRIS_PATH}/track/{id}"),
        None => NO_TRACK.to_string(),
    }
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        self.send(ControlSignal::Next);
    }

    fn previous(&self) {
        self.send(ControlSignal::Prev);
    }

    fn play(&self) {
        self.send(ControlSignal::Play);
    }

    fn pause(&self) {
        self.send(ControlSignal::Pause);
    }

    fn play_pause(&self) {
        self.send(ControlSignal::PlayPause);
    }

    fn stop(&self) {
        self.send(ControlSignal::Stop);
    }

    /// `offset` is in microseconds.
    fn seek(&self, offset: i64) {
        self.send(ControlSignal::SeekBy(offset / 1_000));
    }

    fn set_position(&self, track_id: ObjectPath<'_>, position: i64) {
        let current = track_path(&self.state.view());
        if track_id.as_str() != current || position < 0 {
            return;
        }
        self.send(ControlSignal::Seek((position / 1_000) as u64));
    }

    fn open_uri(&self, uri: String) {
        self.send(ControlSignal::OpenUri(uri));
    }

    #[zbus(property)]
    fn playback_status(&self) -> String {
        let status = match self.state.view().status {
            PlayStatus::Idle => "Stopped",
            PlayStatus::Playing => "Playing",
            PlayStatus::Paused => "Paused",
        };
        status.to_string()
    }

    #[zbus(property)]
    fn loop_status(&self) -> String {
        let status = if self.state.view().repeat_one {
            "Track"
        } else {
            "Playlist"
        };
        status.to_string()
    }

    #[zbus(property)]
    fn set_loop_status(&mut self, value: String) {
        self.send(ControlSignal::SetRepeatOne(value == "Track"));
    }

    #[zbus(property)]
    fn rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn minimum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn maximum_rate(&self) -> f64 {
        1.0
    }

    /// Microseconds.
    #[zbus(property)]
    fn position(&self) -> i64 {
        (self.state.view().position_ms as i64).saturating_mul(1_000)
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        self.state.view().can_play
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        self.state.view().can_pause
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        self.state.view().can_go_next
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        self.state.view().can_go_previous
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        self.state.view().can_seek
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let view = self.state.view().clone();
        let mut map = HashMap::new();

        if let Some(path) = ObjectPath::try_from(track_path(&view)).ok().and_then(owned) {
            map.insert("mpris:trackid".to_string(), path);
        }
        let Some(title) = view.title else {
            return map;
        };

        let mut put = |key: &str, value: Option<OwnedValue>| {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        };
        put("xesam:title", owned(title));
        put("xesam:artist", view.artist.map(|a| vec![a]).and_then(owned));
        put("xesam:album", view.album.and_then(owned));
        put("xesam:url", view.locator.and_then(owned));
        put("mpris:artUrl", view.artwork.and_then(owned));
        put(
            "mpris:length",
            view.duration_ms
                .map(|ms| (ms as i64).saturating_mul(1_000))
                .and_then(owned),
        );
        map
    }
}
