//! Memory traits — long-term recall for the agent loop.
//!
//! After every completed step the loop writes a transcript of the reply and
//! its result as documents; before every model call the prompt builder asks
//! for the documents most relevant to the recent conversation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// A retrievable unit of memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The text of the memory
    pub content: String,

    /// Free-form metadata (source, chunk index, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Read side of memory: ranked recall.
#[async_trait]
pub trait MemoryRetriever: Send + Sync {
    /// Documents relevant to `query`, most relevant first.
    async fn relevant(&self, query: &str) -> Result<Vec<Document>, MemoryError>;
}

/// Write side of memory.
#[async_trait]
pub trait MemoryWriter: Send + Sync {
    async fn add_documents(&self, documents: Vec<Document>) -> Result<(), MemoryError>;
}

/// A backend that can both recall and store.
///
/// Implementations: in-memory (term overlap ranking), none (no-op).
pub trait MemoryStore: MemoryRetriever + MemoryWriter {
    /// The backend name (e.g., "in_memory", "none").
    fn name(&self) -> &str;
}
