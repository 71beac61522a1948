//! `rodio`-backed transport.
//!
//! Each opened locator gets its own paused `Sink` on the default output
//! stream. Seeking prefers `Sink::try_seek` and falls back to rebuilding the
//! sink and skipping into the file.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, warn};

use super::transport::{AudioTransport, TransportError, local_path};

struct OpenHandle {
    locator: String,
    path: PathBuf,
    sink: Sink,
    duration: Option<Duration>,
    /// Where the current source starts inside the file after a rebuild.
    offset: Duration,
    playing: bool,
    completed: bool,
}

pub struct RodioTransport {
    stream: OutputStream,
    current: Option<OpenHandle>,
}

impl RodioTransport {
    /// Open the default output device. The stream is `!Send`, so call this on
    /// the thread that will own the transport.
    pub fn open_default() -> Result<Self, TransportError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| TransportError::NoOutputDevice(e.to_string()))?;
        // rodio logs to stderr when the stream is dropped.
        stream.log_on_drop(false);
        Ok(Self {
            stream,
            current: None,
        })
    }
}

/// Create a paused `Sink` for `path` that starts playback at `start_at`.
fn create_sink_at(
    stream: &OutputStream,
    locator: &str,
    path: &Path,
    start_at: Duration,
) -> Result<(Sink, Option<Duration>), TransportError> {
    let file = File::open(path).map_err(|source| TransportError::Open {
        locator: locator.to_string(),
        source,
    })?;

    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| TransportError::Decode {
        locator: locator.to_string(),
        reason: e.to_string(),
    })?;
    let duration = decoder.total_duration();

    let sink = Sink::connect_new(stream.mixer());
    sink.append(decoder.skip_duration(start_at));
    sink.pause();
    Ok((sink, duration))
}

impl AudioTransport for RodioTransport {
    fn open(&mut self, locator: &str) -> Result<(), TransportError> {
        self.release();

        let path = local_path(locator)?;
        let (sink, duration) = create_sink_at(&self.stream, locator, &path, Duration::ZERO)?;
        debug!(%locator, ?duration, "transport opened");

        self.current = Some(OpenHandle {
            locator: locator.to_string(),
            path,
            sink,
            duration,
            offset: Duration::ZERO,
            playing: false,
            completed: false,
        });
        Ok(())
    }

    fn start(&mut self) {
        if let Some(h) = self.current.as_mut() {
            h.sink.play();
            h.playing = true;
        }
    }

    fn pause(&mut self) {
        if let Some(h) = self.current.as_mut() {
            h.sink.pause();
            h.playing = false;
        }
    }

    fn resume(&mut self) {
        self.start();
    }

    fn seek(&mut self, position_ms: u64) {
        let Self { stream, current } = self;
        let Some(h) = current.as_mut() else {
            return;
        };
        let target = Duration::from_millis(position_ms);

        if !h.sink.empty() && h.sink.try_seek(target).is_ok() {
            h.offset = Duration::ZERO;
            h.completed = false;
            return;
        }

        // Finished sinks and formats without seek support: rebuild at `target`.
        h.sink.stop();
        match create_sink_at(stream, &h.locator, &h.path, target) {
            Ok((sink, _)) => {
                if h.playing {
                    sink.play();
                }
                h.sink = sink;
                h.offset = target;
                h.completed = false;
            }
            Err(e) => warn!(locator = %h.locator, error = %e, "seek rebuild failed"),
        }
    }

    fn release(&mut self) {
        if let Some(h) = self.current.take() {
            h.sink.stop();
            debug!(locator = %h.locator, "transport released");
        }
    }

    fn is_open(&self) -> bool {
        self.current.is_some()
    }

    fn position(&self) -> u64 {
        self.current
            .as_ref()
            .map(|h| (h.offset + h.sink.get_pos()).as_millis() as u64)
            .unwrap_or(0)
    }

    fn duration(&self) -> Option<u64> {
        self.current
            .as_ref()
            .and_then(|h| h.duration)
            .map(|d| d.as_millis() as u64)
    }

    fn take_completion(&mut self) -> bool {
        match self.current.as_mut() {
            Some(h) if h.playing && !h.completed && h.sink.empty() => {
                h.completed = true;
                true
            }
            _ => false,
        }
    }
}
