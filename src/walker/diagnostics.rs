//! Destinations for fetch failures the walker swallows.

use std::sync::{Arc, Mutex};

use tracing::error;

use crate::api::ApiError;

/// Receives communication failures that end a walk early.
pub trait DiagnosticsSink: Send {
    /// Record a failed page fetch starting at `start_at`.
    fn record(&self, start_at: u32, error: &ApiError);
}

/// Logs failures through `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, start_at: u32, err: &ApiError) {
        error!(start_at, error = %err, "Search page fetch failed, ending walk early");
    }
}

/// Keeps failure messages in memory.
///
/// Clones share the same buffer, so a caller can hand one clone to a walker
/// and read the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.messages().is_empty()
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&self, _start_at: u32, err: &ApiError) {
        let mut messages = match self.messages.lock() {
            Ok(messages) => messages,
            Err(poisoned) => poisoned.into_inner(),
        };
        messages.push(err.to_string());
    }
}
