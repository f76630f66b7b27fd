//! Update stream — progress notifications from a running agent loop.
//!
//! Updates are published after every mutation of the saved-step log and on
//! every state transition. Listeners are called synchronously, in
//! registration order, so they observe updates in exactly the order the loop
//! produced them.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::agent::AgentState;
use crate::step::Step;

/// A progress notification. `steps` is always a full snapshot of the
/// saved-step log at the time of publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentUpdate {
    /// A reply was parsed and its step appended (result still empty).
    #[serde(rename = "action:start")]
    ActionStart { iteration: u32, steps: Vec<Step> },

    /// The step's result was recorded.
    #[serde(rename = "action:end")]
    ActionEnd { iteration: u32, steps: Vec<Step> },

    /// The agent moved to a new lifecycle state.
    #[serde(rename = "state")]
    StateChanged { state: AgentState },
}

impl AgentUpdate {
    /// The wire name of this update.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ActionStart { .. } => "action:start",
            Self::ActionEnd { .. } => "action:end",
            Self::StateChanged { .. } => "state",
        }
    }

    pub fn steps(&self) -> Option<&[Step]> {
        match self {
            Self::ActionStart { steps, .. } | Self::ActionEnd { steps, .. } => Some(steps),
            Self::StateChanged { .. } => None,
        }
    }
}

type Listener = Arc<dyn Fn(&AgentUpdate) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// A listener registry for [`AgentUpdate`]s.
#[derive(Clone, Default)]
pub struct UpdateBus {
    listeners: Arc<Mutex<Listeners>>,
}

impl UpdateBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until
    /// [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AgentUpdate) + Send + Sync + 'static,
    {
        let mut guard = lock(&self.listeners);
        let id = guard.next_id;
        guard.next_id += 1;
        guard.entries.push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Deliver an update to every listener.
    pub fn publish(&self, update: &AgentUpdate) {
        // Snapshot first so a listener may subscribe or unsubscribe re-entrantly.
        let listeners: Vec<Listener> = lock(&self.listeners)
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(update);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }
}

/// Handle returned by [`UpdateBus::subscribe`].
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Remove the listener. No-op if the bus is gone.
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
