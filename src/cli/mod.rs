//! Command-line interface for stepsync.

pub mod args;
pub mod commands;
