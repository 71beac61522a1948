//! Joins between the store and the catalog.

use std::collections::HashSet;

use tracing::info;

use crate::library::{Library, Track};

use super::{LibraryStore, PrunedMember, StoreError};

/// Drop playlist members whose locator is not in `catalog`, in a single
/// store write.
pub fn reconcile_playlists(
    store: &dyn LibraryStore,
    catalog: &[Track],
) -> Result<Vec<PrunedMember>, StoreError> {
    let known: HashSet<&str> = catalog.iter().map(|t| t.locator.as_str()).collect();
    let pruned = store.retain_members(&|locator: &str| known.contains(locator))?;
    for member in &pruned {
        info!(playlist = %member.playlist, locator = %member.locator, "pruned stale playlist member");
    }
    Ok(pruned)
}

/// Liked catalog tracks, in catalog order.
pub fn liked_tracks(store: &dyn LibraryStore, library: &Library) -> Result<Vec<Track>, StoreError> {
    let liked: HashSet<String> = store.liked_locators()?.into_iter().collect();
    Ok(library
        .tracks()
        .iter()
        .filter(|t| liked.contains(&t.locator))
        .cloned()
        .collect())
}

/// Members of `name` resolved through `library`, in membership order.
/// Members missing from the catalog are skipped.
pub fn playlist_tracks(
    store: &dyn LibraryStore,
    name: &str,
    library: &Library,
) -> Result<Vec<Track>, StoreError> {
    Ok(store
        .members_of(name)?
        .iter()
        .filter_map(|locator| library.by_locator(locator).cloned())
        .collect())
}
