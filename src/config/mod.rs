//! Configuration management for stepsync.
//!
//! This module handles loading and saving configuration from `~/.stepsync/`.

mod paths;
mod settings;

pub use paths::{Paths, HOME_ENV};
pub use settings::{Config, ConnectivityConfig, LoggingConfig, RemoteConfig, SyncConfig};
