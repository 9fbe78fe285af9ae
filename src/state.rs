use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, StoreError};

/// Storage key holding the serialized session
pub const SESSION_KEY: &str = "sessionBlob";

/// Form values and progress saved between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub current_step: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub background_text: String,
    #[serde(default)]
    pub outline_text: String,
    pub last_updated: DateTime<Utc>,
}

/// Reads and writes the wizard session through a key-value store
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Overwrite the saved session
    pub fn save(&self, session: &PersistedSession) -> Result<(), StoreError> {
        let blob = serde_json::to_string(session).map_err(|source| StoreError::Serialize {
            key: SESSION_KEY.to_string(),
            source,
        })?;
        self.store.set(SESSION_KEY, &blob)?;
        tracing::debug!(
            step = session.current_step,
            title = %session.title,
            "Session saved"
        );
        Ok(())
    }

    /// Load the last saved session.
    ///
    /// Missing, unreadable and malformed sessions all come back as `None`.
    pub fn load(&self) -> Option<PersistedSession> {
        let blob = match self.store.get(SESSION_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read saved session");
                return None;
            }
        };

        match serde_json::from_str(&blob) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed saved session");
                None
            }
        }
    }

    /// Remove the saved session
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(SESSION_KEY)
    }
}

/// Trailing-edge debounce for session writes.
///
/// Each change pushes the deadline out by `delay`; the write fires once the
/// input has been quiet for that long.
#[derive(Debug, Clone)]
pub struct SaveDebouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl SaveDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Record a change at `now`
    pub fn mark_dirty(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once when a pending write is due
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending write, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}
