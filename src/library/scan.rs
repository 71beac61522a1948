use std::path::Path;
use std::time::Duration;

use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::{Track, TrackId};

const UNKNOWN_ARTIST: &str = "Unknown Artist";

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Build the transport locator for a local file. Paths that are not valid
/// UTF-8 have no locator that maps back to them.
pub fn file_locator(path: &Path) -> Option<String> {
    path.to_str().map(|p| format!("file://{p}"))
}

/// First configured sidecar image found next to `path`.
fn sidecar_artwork(path: &Path, settings: &LibrarySettings) -> Option<String> {
    let dir = path.parent()?;
    settings
        .artwork_names
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
        .and_then(|p| file_locator(&p))
}

struct Tags {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    duration: Option<Duration>,
}

fn non_empty(v: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn read_tags(path: &Path) -> Tags {
    let mut tags = Tags {
        title: None,
        artist: None,
        album: None,
        duration: None,
    };

    match lofty::read_from_path(path) {
        Ok(tagged) => {
            tags.duration = Some(tagged.properties().duration()).filter(|d| !d.is_zero());
            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                tags.title = non_empty(tag.title());
                tags.artist = non_empty(tag.artist());
                tags.album = non_empty(tag.album());
            }
        }
        Err(e) => debug!(path = %path.display(), error = %e, "no readable tags"),
    }

    tags
}

/// Walk `dir` and build the catalog. Ids follow the sorted order, so they are
/// only stable within one scan.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || !is_audio_file(path, settings) {
            continue;
        }

        let Some(locator) = file_locator(path) else {
            debug!(path = %path.display(), "skipping path that is not valid UTF-8");
            continue;
        };

        let tags = read_tags(path);
        let title = tags.title.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("UNKNOWN")
                .to_string()
        });

        tracks.push(Track {
            id: TrackId(0),
            title,
            artist: tags.artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: tags.album,
            locator,
            artwork: sidecar_artwork(path, settings),
            duration: tags.duration,
        });
    }

    tracks.sort_by(|a, b| {
        a.title
            .to_lowercase()
            .cmp(&b.title.to_lowercase())
            .then_with(|| a.locator.cmp(&b.locator))
    });
    for (i, track) in tracks.iter_mut().enumerate() {
        track.id = TrackId(i as u64);
    }

    info!(root = %dir.display(), count = tracks.len(), "catalog scanned");
    tracks
}
