//! Liked tracks and playlists, keyed by locator.
//!
//! Locators survive a rescan while track ids do not, so everything persisted
//! here refers to tracks by locator and is resolved through the current
//! [`Library`](crate::library::Library) when read back.

use std::path::PathBuf;

use thiserror::Error;

mod file;
mod model;
mod resolve;

pub use file::FileStore;
pub use model::{Playlist, PlaylistSummary, PrunedMember, StoreData};
pub use resolve::{liked_tracks, playlist_tracks, reconcile_playlists};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode store: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("failed to decode store: {0}")]
    Decode(#[from] toml::de::Error),

    #[error("no playlist named {0:?}")]
    PlaylistNotFound(String),

    #[error("a playlist named {0:?} already exists")]
    PlaylistExists(String),
}

/// Persistence for liked state and playlists.
///
/// Failures go back to the caller and are never retried here. Playback never
/// waits on the store.
pub trait LibraryStore: Send + Sync {
    fn is_liked(&self, locator: &str) -> Result<bool, StoreError>;

    fn set_liked(&self, locator: &str, liked: bool) -> Result<(), StoreError>;

    /// Liked locators in sorted order.
    fn liked_locators(&self) -> Result<Vec<String>, StoreError>;

    /// Creating an existing playlist is a no-op.
    fn create_playlist(&self, name: &str) -> Result<(), StoreError>;

    /// Deleting a missing playlist is a no-op.
    fn delete_playlist(&self, name: &str) -> Result<(), StoreError>;

    fn rename_playlist(&self, from: &str, to: &str) -> Result<(), StoreError>;

    /// Append `locator`. Returns `false` if it was already a member.
    fn add_to_playlist(&self, name: &str, locator: &str) -> Result<bool, StoreError>;

    /// Returns `false` if `locator` was not a member.
    fn remove_from_playlist(&self, name: &str, locator: &str) -> Result<bool, StoreError>;

    fn list_playlists(&self) -> Result<Vec<PlaylistSummary>, StoreError>;

    /// Member locators in insertion order.
    fn members_of(&self, name: &str) -> Result<Vec<String>, StoreError>;

    /// Drop every member, in every playlist, that `keep` rejects. Applied as
    /// one mutation: either all of them go or none do.
    fn retain_members(
        &self,
        keep: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<PrunedMember>, StoreError>;
}
