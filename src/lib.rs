//! stepsync - offline-first sync for a recovery-tracking client
//!
//! Writes made while the device has no connectivity are persisted to a
//! durable local queue and replayed against the hosted API, in order, once
//! the network returns.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod remote;
pub mod storage;
pub mod sync;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::StepsyncError;
pub use sync::SyncService;
