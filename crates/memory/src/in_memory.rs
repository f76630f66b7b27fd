//! In-memory store — the default backend for a single agent run.

use async_trait::async_trait;
use orchestra_core::error::MemoryError;
use orchestra_core::memory::{Document, MemoryRetriever, MemoryStore, MemoryWriter};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::similarity::{TermVector, cosine_similarity, term_vector};

struct Entry {
    document: Document,
    vector: TermVector,
}

/// An in-memory store that keeps documents in a Vec and ranks them by
/// lexical cosine similarity to the query.
pub struct InMemoryStore {
    entries: Arc<RwLock<Vec<Entry>>>,
    limit: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_limit(4)
    }

    /// Return at most `limit` documents per recall.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            limit,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryRetriever for InMemoryStore {
    async fn relevant(&self, query: &str) -> Result<Vec<Document>, MemoryError> {
        let query_vector = term_vector(query);
        let entries = self.entries.read().await;

        let mut scored: Vec<(f32, usize)> = entries
            .iter()
            .enumerate()
            .map(|(idx, e)| (cosine_similarity(&query_vector, &e.vector), idx))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        // Highest score first; newer documents win ties.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.1.cmp(&a.1))
        });
        scored.truncate(self.limit);

        tracing::debug!(query_len = query.len(), hits = scored.len(), "Memory recall");
        Ok(scored
            .into_iter()
            .map(|(_, idx)| entries[idx].document.clone())
            .collect())
    }
}

#[async_trait]
impl MemoryWriter for InMemoryStore {
    async fn add_documents(&self, documents: Vec<Document>) -> Result<(), MemoryError> {
        let mut entries = self.entries.write().await;
        for document in documents {
            let vector = term_vector(&document.content);
            entries.push(Entry { document, vector });
        }
        Ok(())
    }
}

impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(contents: &[&str]) -> Vec<Document> {
        contents.iter().map(|c| Document::new(*c)).collect()
    }

    #[tokio::test]
    async fn store_and_recall() {
        let mem = InMemoryStore::new();
        mem.add_documents(docs(&["Rust is a systems language"])).await.unwrap();
        assert_eq!(mem.len().await, 1);

        let hits = mem.relevant("tell me about rust").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "Rust is a systems language");
    }

    #[tokio::test]
    async fn recall_ranks_most_relevant_first() {
        let mem = InMemoryStore::new();
        mem.add_documents(docs(&[
            "Python is great for scripting",
            "Rust is great for systems programming in rust",
            "JavaScript runs in the browser",
        ]))
        .await
        .unwrap();

        let hits = mem.relevant("rust systems programming").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("Rust"));

        let hits = mem.relevant("great rust").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].content.contains("Rust"));
        assert!(hits[1].content.contains("Python"));
    }

    #[tokio::test]
    async fn recall_respects_limit() {
        let mem = InMemoryStore::with_limit(2);
        mem.add_documents(docs(&["haiku one", "haiku two", "haiku three"]))
            .await
            .unwrap();
        let hits = mem.relevant("haiku").await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn unrelated_query_recalls_nothing() {
        let mem = InMemoryStore::new();
        mem.add_documents(docs(&["Assistant Reply: wrote file"])).await.unwrap();
        assert!(mem.relevant("quantum chromodynamics").await.unwrap().is_empty());
        assert!(mem.relevant("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_store_recalls_nothing() {
        let mem = InMemoryStore::default();
        assert!(mem.is_empty().await);
        assert!(mem.relevant("anything").await.unwrap().is_empty());
    }
}
