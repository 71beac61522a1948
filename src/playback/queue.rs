//! Ordered playback queue with a circular cursor.

use crate::library::Track;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queue {
    tracks: Vec<Track>,
    cursor: Option<usize>,
}

impl Queue {
    /// Build a queue; an out-of-range cursor is dropped.
    pub fn new(tracks: Vec<Track>, cursor: Option<usize>) -> Self {
        let cursor = cursor.filter(|&c| c < tracks.len());
        Self { tracks, cursor }
    }

    /// Replace the queue and point the cursor at `focus`. If `focus` is not
    /// part of `tracks`, the queue becomes just `[focus]`.
    pub fn replace(&mut self, tracks: Vec<Track>, focus: &Track) {
        match tracks.iter().position(|t| t == focus) {
            Some(pos) => {
                self.tracks = tracks;
                self.cursor = Some(pos);
            }
            None => {
                self.tracks = vec![focus.clone()];
                self.cursor = Some(0);
            }
        }
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

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Point the cursor at `index`. Out-of-range indexes are ignored.
    pub fn set_cursor(&mut self, index: usize) -> bool {
        if index < self.tracks.len() {
            self.cursor = Some(index);
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|c| self.tracks.get(c))
    }

    /// Move forward, wrapping at the end. No cursor starts at the head.
    pub fn advance(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            return None;
        }
        let next = match self.cursor {
            Some(c) => (c + 1) % self.tracks.len(),
            None => 0,
        };
        self.cursor = Some(next);
        self.tracks.get(next)
    }

    /// Move back, wrapping at the head. No cursor starts at the head.
    pub fn retreat(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            return None;
        }
        let len = self.tracks.len();
        let prev = match self.cursor {
            Some(c) => (c + len - 1) % len,
            None => 0,
        };
        self.cursor = Some(prev);
        self.tracks.get(prev)
    }
}
