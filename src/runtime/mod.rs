//! Binary wiring: settings, logging, catalog, store, engine and host.

use std::env;
use std::sync::Arc;
use std::sync::mpsc;

use tracing::{info, warn};

use crate::audio::RodioTransport;
use crate::playback::EngineHandle;
use crate::session::{ControlSignal, SessionHost};

mod logging;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, config_warning) = settings::load_settings();
    logging::init(&settings.log);
    if let Some(msg) = config_warning {
        warn!("{msg}");
    }

    let dir = startup::music_dir(env::args().nth(1), &settings.library);
    info!(dir = %dir.display(), "scanning library");
    let library = Arc::new(startup::load_library(dir, &settings.library));
    let store = startup::open_store(&settings.store, &library);

    let engine = EngineHandle::spawn(RodioTransport::open_default, &settings.playback)?;
    let mut host =
        SessionHost::new(engine, Arc::clone(&library), &settings.session).with_store(store);

    let (tx, rx) = mpsc::channel::<ControlSignal>();
    startup::attach_surfaces(&mut host, tx, &settings.session);
    host.cue(library.tracks().to_vec(), (!library.is_empty()).then_some(0));

    let exit = host.run(&rx);
    info!(?exit, "session ended");
    host.shutdown();
    Ok(())
}
