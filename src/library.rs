//! Track catalog: the scanned model, directory scanning and lookups.
//!
//! The catalog is queried once per refresh; everything downstream works on
//! the resulting [`Library`] snapshot.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::config::LibrarySettings;

mod model;
mod scan;

pub use model::{Track, TrackId};
pub use scan::{file_locator, scan};

/// Source of the track list.
pub trait Catalog {
    fn list_tracks(&self) -> Vec<Track>;
}

/// Catalog backed by a music directory on disk.
pub struct DirectoryCatalog {
    root: PathBuf,
    settings: LibrarySettings,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>, settings: LibrarySettings) -> Self {
        Self {
            root: root.into(),
            settings,
        }
    }
}

impl Catalog for DirectoryCatalog {
    fn list_tracks(&self) -> Vec<Track> {
        scan(&self.root, &self.settings)
    }
}

impl Catalog for Vec<Track> {
    fn list_tracks(&self) -> Vec<Track> {
        self.clone()
    }
}

/// One catalog snapshot with lookup indexes.
#[derive(Debug, Clone, Default)]
pub struct Library {
    tracks: Vec<Track>,
    by_id: HashMap<TrackId, usize>,
    by_locator: HashMap<String, usize>,
}

impl Library {
    pub fn new(tracks: Vec<Track>) -> Self {
        let by_id = tracks.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
        let by_locator = tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.locator.clone(), i))
            .collect();
        Self {
            tracks,
            by_id,
            by_locator,
        }
    }

    pub fn refresh(catalog: &dyn Catalog) -> Self {
        Self::new(catalog.list_tracks())
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn by_id(&self, id: TrackId) -> Option<&Track> {
        self.by_id.get(&id).map(|&i| &self.tracks[i])
    }

    pub fn by_locator(&self, locator: &str) -> Option<&Track> {
        self.by_locator.get(locator).map(|&i| &self.tracks[i])
    }

    /// First track with exactly this title.
    pub fn by_title(&self, title: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.title == title)
    }

    pub fn by_artist(&self, artist: &str) -> Vec<Track> {
        self.tracks
            .iter()
            .filter(|t| t.artist == artist)
            .cloned()
            .collect()
    }

    pub fn locators(&self) -> HashSet<&str> {
        self.by_locator.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests;
