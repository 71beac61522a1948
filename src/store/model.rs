use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// On-disk layout of the store file.
///
/// ```toml
/// liked = ["file:///music/a.mp3"]
///
/// [[playlists]]
/// name = "Morning"
/// members = ["file:///music/a.mp3", "file:///music/b.flac"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreData {
    pub liked: BTreeSet<String>,
    pub playlists: Vec<Playlist>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    /// Ordered, without duplicates.
    #[serde(default)]
    pub members: Vec<String>,
}

/// A playlist member dropped because no catalog track matches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedMember {
    pub playlist: String,
    pub locator: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub name: String,
    pub member_count: usize,
}

impl StoreData {
    pub fn playlist(&self, name: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.name == name)
    }

    pub fn playlist_mut(&mut self, name: &str) -> Option<&mut Playlist> {
        self.playlists.iter_mut().find(|p| p.name == name)
    }

    /// Drop members rejected by `keep` from every playlist.
    pub fn retain_members(&mut self, keep: &dyn Fn(&str) -> bool) -> Vec<PrunedMember> {
        let mut pruned = Vec::new();
        for Playlist { name, members } in &mut self.playlists {
            members.retain(|locator| {
                let kept = keep(locator);
                if !kept {
                    pruned.push(PrunedMember {
                        playlist: name.clone(),
                        locator: locator.clone(),
                    });
                }
                kept
            });
        }
        pruned
    }
}
