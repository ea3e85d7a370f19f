//! Fire-and-forget notification channel.

use std::sync::Mutex;

use async_trait::async_trait;

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, message: String);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMessenger;

#[async_trait]
impl Messenger for TracingMessenger {
    async fn send(&self, message: String) {
        tracing::info!(target: "ribeye::notification", %message, "Notification");
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct MemoryMessenger {
    messages: Mutex<Vec<String>>,
}

impl MemoryMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl Messenger for MemoryMessenger {
    async fn send(&self, message: String) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}
