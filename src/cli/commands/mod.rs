//! Command implementations for stepsync.
//!
//! Each command returns the text to print; `main` owns stdout.

mod completions;
mod config;
mod sync;

pub use completions::completions;
pub use config::config;
pub use sync::{list, status, sync, watch, write};
