//! `reprise`: a background music player built around one playback engine.
//!
//! The [`playback`] engine owns the audio [`audio`] transport and the queue;
//! the [`session`] host keeps it alive without a UI and bridges external
//! control surfaces; [`store`] persists liked tracks and playlists against
//! the scanned [`library`].

pub mod audio;
pub mod config;
pub mod library;
pub mod playback;
pub mod runtime;
pub mod session;
pub mod store;
pub mod sync;
