//! In-process remote stub for sync tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::Notify;

use super::operation::{DailyEntryPayload, JournalEntryPayload, Mutation};
use crate::error::StepsyncError;
use crate::remote::{RemoteApi, RemoteFuture};

/// One call seen by the stub.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub mutation: Mutation,
    pub idempotency_key: Option<String>,
}

/// Records calls; fails the calls whose 1-based index is listed.
#[derive(Default)]
pub struct StubRemote {
    calls: Mutex<Vec<RecordedCall>>,
    failing_calls: Mutex<HashSet<usize>>,
    reject_all: bool,
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
}

impl StubRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            failing_calls: Mutex::new(calls.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject_all: true,
            ..Self::default()
        }
    }

    /// Every call waits on `gate` before answering.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Notified each time a call starts.
    pub fn entered(&self) -> Arc<Notify> {
        Arc::clone(&self.entered)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl RemoteApi for StubRemote {
    fn execute<'a>(&'a self, mutation: &'a Mutation, idempotency_key: Option<&'a str>) -> RemoteFuture<'a> {
        Box::pin(async move {
            let number = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(RecordedCall {
                    mutation: mutation.clone(),
                    idempotency_key: idempotency_key.map(str::to_string),
                });
                calls.len()
            };
            self.entered.notify_one();

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            if self.reject_all {
                return Err(StepsyncError::Remote {
                    status: 422,
                    message: "rejected".to_string(),
                });
            }
            if self.failing_calls.lock().unwrap().contains(&number) {
                return Err(StepsyncError::Network("connection reset".to_string()));
            }
            Ok(json!({ "ok": true, "call": number }))
        })
    }
}

pub fn journal(content: &str) -> Mutation {
    Mutation::JournalCreate(JournalEntryPayload {
        id: None,
        title: None,
        content: content.to_string(),
        mood: None,
        tags: Vec::new(),
        entry_date: None,
    })
}

pub fn gratitude(text: &str) -> Mutation {
    Mutation::DailyEntryUpsert(DailyEntryPayload {
        gratitude: Some(text.to_string()),
        ..DailyEntryPayload::default()
    })
}
