//! Storage layer for stepsync.
//!
//! This module provides SQLite-based persistence for the offline operation
//! queue.

mod database;
mod migrations;

pub use database::Database;
