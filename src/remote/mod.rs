//! Boundary to the hosted recovery API.
//!
//! The sync subsystem only needs "submit operation, get success or failure";
//! everything else about the remote surface lives outside this crate.

mod client;

pub use client::{endpoint_for, Endpoint, HttpRemote, RemoteApi, RemoteFuture};
