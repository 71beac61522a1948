use std::fmt;
use std::time::Duration;

/// Session-scoped track identity. Reassigned on every catalog scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable playable item produced by the catalog.
///
/// Two tracks are equal when their ids are equal; the locator is the identity
/// used for anything persisted across restarts.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Opaque URI understood by the audio transport (`file:///...`).
    pub locator: String,
    pub artwork: Option<String>,
    pub duration: Option<Duration>,
}

impl Track {
    pub fn new(
        id: u64,
        title: impl Into<String>,
        artist: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            id: TrackId(id),
            title: title.into(),
            artist: artist.into(),
            album: None,
            locator: locator.into(),
            artwork: None,
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    /// Duration in milliseconds, when the tags carried one.
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration.map(|d| d.as_millis() as u64)
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}
