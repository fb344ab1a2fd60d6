//! Notices sent to connected observers about save progress.

use std::sync::Mutex;

use tracing::info;

/// Who a notice is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    /// Every connected observer.
    Everyone,
    /// Privileged observers only.
    Staff,
}

/// Sink for user-visible save notices.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, audience: Audience, message: &str);
}

/// Writes notices to the log. Used when no network layer is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogBroadcaster;

impl Broadcaster for LogBroadcaster {
    fn broadcast(&self, audience: Audience, message: &str) {
        info!(?audience, "{message}");
    }
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    messages: Mutex<Vec<(Audience, String)>>,
}

impl RecordingBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notice received so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<(Audience, String)> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns `true` if a notice for `audience` starting with `prefix` was
    /// received.
    #[must_use]
    pub fn contains(&self, audience: Audience, prefix: &str) -> bool {
        self.messages()
            .iter()
            .any(|(a, m)| *a == audience && m.starts_with(prefix))
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast(&self, audience: Audience, message: &str) {
        let mut messages = match self.messages.lock() {
            Ok(messages) => messages,
            Err(poisoned) => poisoned.into_inner(),
        };
        messages.push((audience, message.to_owned()));
    }
}
