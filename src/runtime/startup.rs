use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use tracing::{info, warn};

use crate::config::{LibrarySettings, SessionSettings, StoreSettings};
use crate::library::{DirectoryCatalog, Library};
use crate::session::{ControlSignal, MprisSurface, SessionHost};
use crate::store::{FileStore, LibraryStore, reconcile_playlists};

/// Music directory: command-line argument, then `library.root`, then the
/// current directory.
pub fn music_dir(arg: Option<String>, settings: &LibrarySettings) -> PathBuf {
    arg.map(PathBuf::from)
        .or_else(|| settings.root.clone())
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn load_library(dir: PathBuf, settings: &LibrarySettings) -> Library {
    let library = Library::refresh(&DirectoryCatalog::new(dir, settings.clone()));
    if library.is_empty() {
        warn!("no playable tracks found");
    }
    library
}

/// Open the persistent store and prune members missing from `library`.
/// Falls back to an in-memory store when the file cannot be used.
pub fn open_store(settings: &StoreSettings, library: &Library) -> Arc<dyn LibraryStore> {
    let store = match settings.resolved_path() {
        Some(path) => FileStore::open(&path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "store unavailable, keeping changes in memory");
            FileStore::in_memory()
        }),
        None => FileStore::in_memory(),
    };

    match reconcile_playlists(&store, library.tracks()) {
        Ok(pruned) if !pruned.is_empty() => info!(count = pruned.len(), "playlists reconciled"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "playlist reconciliation failed"),
    }
    Arc::new(store)
}

pub fn attach_surfaces(host: &mut SessionHost, tx: Sender<ControlSignal>, settings: &SessionSettings) {
    if !settings.mpris {
        return;
    }
    match MprisSurface::spawn(&settings.identity, tx) {
        Ok(surface) => host.attach_surface(Box::new(surface)),
        Err(e) => warn!(error = %e, "MPRIS surface unavailable"),
    }
}
