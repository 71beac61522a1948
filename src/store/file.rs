use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::model::{Playlist, PlaylistSummary, PrunedMember, StoreData};
use super::{LibraryStore, StoreError};

/// TOML-file store. Every mutation rewrites the file through a temporary file
/// and a rename, so a crash never leaves a half-written store behind.
#[derive(Debug)]
pub struct FileStore {
    path: Option<PathBuf>,
    data: Mutex<StoreData>,
}

impl FileStore {
    /// Load `path`, or start empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => StoreData::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        debug!(path = %path.display(), "store opened");
        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(StoreData::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn data(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to a copy; persist and commit only if it succeeded and
    /// changed something.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut StoreData) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut data = self.data();
        let mut next = data.clone();
        let out = f(&mut next)?;
        if next != *data {
            self.persist(&next)?;
            *data = next;
        }
        Ok(out)
    }

    fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = toml::to_string_pretty(data)?;
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, text).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }
}

impl LibraryStore for FileStore {
    fn is_liked(&self, locator: &str) -> Result<bool, StoreError> {
        Ok(self.data().liked.contains(locator))
    }

    fn set_liked(&self, locator: &str, liked: bool) -> Result<(), StoreError> {
        self.mutate(|d| {
            if liked {
                d.liked.insert(locator.to_string());
            } else {
                d.liked.remove(locator);
            }
            Ok(())
        })
    }

    fn liked_locators(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.data().liked.iter().cloned().collect())
    }

    fn create_playlist(&self, name: &str) -> Result<(), StoreError> {
        self.mutate(|d| {
            if d.playlist(name).is_none() {
                d.playlists.push(Playlist {
                    name: name.to_string(),
                    members: Vec::new(),
                });
            }
            Ok(())
        })
    }

    fn delete_playlist(&self, name: &str) -> Result<(), StoreError> {
        self.mutate(|d| {
            d.playlists.retain(|p| p.name != name);
            Ok(())
        })
    }

    fn rename_playlist(&self, from: &str, to: &str) -> Result<(), StoreError> {
        self.mutate(|d| {
            if d.playlist(from).is_none() {
                return Err(StoreError::PlaylistNotFound(from.to_string()));
            }
            if from == to {
                return Ok(());
            }
            if d.playlist(to).is_some() {
                return Err(StoreError::PlaylistExists(to.to_string()));
            }
            if let Some(p) = d.playlist_mut(from) {
                p.name = to.to_string();
            }
            Ok(())
        })
    }

    fn add_to_playlist(&self, name: &str, locator: &str) -> Result<bool, StoreError> {
        self.mutate(|d| {
            let p = d
                .playlist_mut(name)
                .ok_or_else(|| StoreError::PlaylistNotFound(name.to_string()))?;
            if p.members.iter().any(|m| m == locator) {
                return Ok(false);
            }
            p.members.push(locator.to_string());
            Ok(true)
        })
    }

    fn remove_from_playlist(&self, name: &str, locator: &str) -> Result<bool, StoreError> {
        self.mutate(|d| {
            let p = d
                .playlist_mut(name)
                .ok_or_else(|| StoreError::PlaylistNotFound(name.to_string()))?;
            let before = p.members.len();
            p.members.retain(|m| m != locator);
            Ok(p.members.len() != before)
        })
    }

    fn list_playlists(&self) -> Result<Vec<PlaylistSummary>, StoreError> {
        Ok(self
            .data()
            .playlists
            .iter()
            .map(|p| PlaylistSummary {
                name: p.name.clone(),
                member_count: p.members.len(),
            })
            .collect())
    }

    fn members_of(&self, name: &str) -> Result<Vec<String>, StoreError> {
        self.data()
            .playlist(name)
            .map(|p| p.members.clone())
            .ok_or_else(|| StoreError::PlaylistNotFound(name.to_string()))
    }

    fn retain_members(
        &self,
        keep: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<PrunedMember>, StoreError> {
        self.mutate(|d| Ok(d.retain_members(keep)))
    }
}
