//! Chat message types.
//!
//! Messages are the unit of the agent's conversation history. The loop
//! appends them in strict order and never mutates one after the fact; the
//! prompt builder only ever reads a window of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in the agent conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The operator, or the loop speaking on the operator's behalf
    Human,
    /// The language model
    Ai,
    /// Instructions, retrieved memory and tool observations
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Ai => "ai",
            Self::System => "system",
        }
    }
}

/// A single message in the agent's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self::with_role(Role::Human, content)
    }

    /// Create a new AI message.
    pub fn ai(content: impl Into<String>) -> Self {
        Self::with_role(Role::Ai, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }
}

/// The `{role, text}` projection used when a window of history is rendered
/// as a memory query.
#[derive(Debug, Serialize)]
pub struct MessageView<'a> {
    pub role: Role,
    pub text: &'a str,
}

impl<'a> From<&'a Message> for MessageView<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            role: message.role,
            text: &message.content,
        }
    }
}
