//! Admin notifiers that do not leave the process.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ports::AdminNotifier;

/// Writes admin notices to the log. Used when no Telegram chat is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl AdminNotifier for LogNotifier {
    async fn notify(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        tracing::info!(target: "admin", text = %text, "Admin notice");
    }
}

/// Keeps every notice in memory for assertions.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Returns true if any notice contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

#[async_trait]
impl AdminNotifier for RecordingNotifier {
    async fn notify(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.messages
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(text.to_string());
    }
}
