//! Run registry — at most one active run per session key.
//!
//! A second `try_begin` for a busy key is rejected rather than queued. The
//! key is released when the returned [`RunGuard`] is dropped.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::AgentError;

#[derive(Clone, Default)]
pub struct RunRegistry {
    active: Arc<Mutex<HashSet<String>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for a new run.
    pub fn try_begin(&self, key: impl Into<String>) -> Result<RunGuard, AgentError> {
        let key = key.into();
        if !self.lock().insert(key.clone()) {
            return Err(AgentError::SessionBusy(key));
        }
        debug!(session = %key, "Run registered");
        Ok(RunGuard {
            key,
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Holds a session key for the lifetime of a run.
pub struct RunGuard {
    key: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl RunGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.key);
        debug!(session = %self.key, "Run released");
    }
}
