//! Rename downloaded episodes into a Plex style library and keep watched
//! download directories in sync with it.

pub mod config;
pub mod error;
pub mod library;
pub mod logging;
pub mod orchestrator;
pub mod prompt;
pub mod rename_engine;
pub mod torrent_status;
pub mod watch;
pub mod watch_registry;

pub use error::{Error, Result};
