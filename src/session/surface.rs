use crate::library::TrackId;
use crate::playback::{PlayStatus, PlaybackSnapshot};

/// Everything a control surface shows. Rebuilt from each snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceView {
    pub track_id: Option<TrackId>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<String>,
    pub locator: Option<String>,
    pub status: PlayStatus,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    pub repeat_one: bool,
    pub liked: bool,
    pub can_play: bool,
    pub can_pause: bool,
    pub can_go_next: bool,
    pub can_go_previous: bool,
    pub can_seek: bool,
    /// Short-lived message such as a track that failed to open. Cleared by
    /// the next control signal.
    pub notice: Option<String>,
}

impl SurfaceView {
    pub fn from_snapshot(snapshot: &PlaybackSnapshot, liked: bool) -> Self {
        let track = snapshot.track.as_ref();
        let has_queue = snapshot.queue_len > 0;
        Self {
            track_id: track.map(|t| t.id),
            title: track.map(|t| t.title.clone()),
            artist: track.map(|t| t.artist.clone()),
            album: track.and_then(|t| t.album.clone()),
            artwork: track.and_then(|t| t.artwork.clone()),
            locator: track.map(|t| t.locator.clone()),
            status: snapshot.status,
            position_ms: snapshot.position_ms,
            duration_ms: snapshot.duration_ms,
            repeat_one: snapshot.repeat_one,
            liked: track.is_some() && liked,
            can_play: track.is_some() || has_queue,
            can_pause: snapshot.is_playing(),
            can_go_next: has_queue,
            can_go_previous: has_queue,
            can_seek: snapshot.is_loaded() && snapshot.duration_ms.is_some(),
            notice: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlayStatus::Playing
    }

    /// Same view apart from the playback position.
    pub fn same_apart_from_position(&self, other: &Self) -> bool {
        let strip = |v: &Self| Self {
            position_ms: 0,
            ..v.clone()
        };
        strip(self) == strip(other)
    }
}

/// An external surface (notification, media-key service, bus object).
pub trait ControlSurface: Send {
    fn render(&self, view: &SurfaceView);

    /// Called once when the host releases everything.
    fn clear(&self) {}
}
