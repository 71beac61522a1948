//! In-memory transport driven by tests.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use super::transport::{AudioTransport, TransportError};

#[derive(Debug, Default)]
pub struct ScriptState {
    pub durations: HashMap<String, u64>,
    pub failing: HashSet<String>,
    pub open: Option<String>,
    pub playing: bool,
    pub position_ms: u64,
    pub finished: bool,
    pub opens: Vec<String>,
    pub releases: usize,
}

/// Clones share one state, so a test keeps a clone while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTransport {
    pub fn with_track(self, locator: &str, duration_ms: u64) -> Self {
        self.state()
            .durations
            .insert(locator.to_string(), duration_ms);
        self
    }

    pub fn failing(self, locator: &str) -> Self {
        self.state().failing.insert(locator.to_string());
        self
    }

    pub fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Let `ms` of audio play if the handle is running.
    pub fn advance(&self, ms: u64) {
        let mut s = self.state();
        if s.open.is_some() && s.playing {
            let cap = s
                .open
                .as_ref()
                .and_then(|l| s.durations.get(l).copied())
                .unwrap_or(u64::MAX);
            s.position_ms = (s.position_ms + ms).min(cap);
        }
    }

    /// Reach the natural end of the open track.
    pub fn finish(&self) {
        let mut s = self.state();
        if let Some(d) = s.open.as_ref().and_then(|l| s.durations.get(l).copied()) {
            s.position_ms = d;
        }
        s.finished = true;
    }

    pub fn opens(&self) -> Vec<String> {
        self.state().opens.clone()
    }
}

impl AudioTransport for ScriptedTransport {
    fn open(&mut self, locator: &str) -> Result<(), TransportError> {
        self.release();
        let mut s = self.state();
        if s.failing.contains(locator) {
            return Err(TransportError::Open {
                locator: locator.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "scripted failure"),
            });
        }
        s.open = Some(locator.to_string());
        s.playing = false;
        s.position_ms = 0;
        s.finished = false;
        s.opens.push(locator.to_string());
        Ok(())
    }

    fn start(&mut self) {
        let mut s = self.state();
        if s.open.is_some() {
            s.playing = true;
        }
    }

    fn pause(&mut self) {
        self.state().playing = false;
    }

    fn resume(&mut self) {
        self.start();
    }

    fn seek(&mut self, position_ms: u64) {
        let mut s = self.state();
        if s.open.is_some() {
            s.position_ms = position_ms;
            s.finished = false;
        }
    }

    fn release(&mut self) {
        let mut s = self.state();
        if s.open.take().is_some() {
            s.releases += 1;
        }
        s.playing = false;
        s.position_ms = 0;
        s.finished = false;
    }

    fn is_open(&self) -> bool {
        self.state().open.is_some()
    }

    fn position(&self) -> u64 {
        self.state().position_ms
    }

    fn duration(&self) -> Option<u64> {
        let s = self.state();
        s.open.as_ref().and_then(|l| s.durations.get(l).copied())
    }

    fn take_completion(&mut self) -> bool {
        let mut s = self.state();
        if s.open.is_some() && s.finished {
            s.finished = false;
            true
        } else {
            false
        }
    }
}
