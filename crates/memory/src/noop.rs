//! No-op memory backend — disables long-term memory entirely.

use async_trait::async_trait;
use orchestra_core::error::MemoryError;
use orchestra_core::memory::{Document, MemoryRetriever, MemoryStore, MemoryWriter};

/// A no-op memory backend that stores nothing and recalls nothing.
pub struct NoopMemory;

#[async_trait]
impl MemoryRetriever for NoopMemory {
    async fn relevant(&self, _query: &str) -> Result<Vec<Document>, MemoryError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl MemoryWriter for NoopMemory {
    async fn add_documents(&self, _documents: Vec<Document>) -> Result<(), MemoryError> {
        Ok(())
    }
}

impl MemoryStore for NoopMemory {
    fn name(&self) -> &str {
        "none"
    }
}
