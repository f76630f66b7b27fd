//! Token-bounded text splitting for memory writes.
//!
//! Step transcripts can be longer than the embedding model accepts, so they
//! are cut into chunks of at most `chunk_size` tokens before being stored.
//! Consecutive chunks share up to `chunk_overlap` tokens of context.

use orchestra_core::memory::Document;
use orchestra_core::provider::TokenCounter;
use std::collections::VecDeque;
use std::sync::Arc;

/// Splits text on whitespace boundaries into token-bounded chunks.
///
/// A single whitespace-free run longer than `chunk_size` becomes a chunk of
/// its own.
pub struct TokenTextSplitter {
    counter: Arc<dyn TokenCounter>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TokenTextSplitter {
    /// `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(counter: Arc<dyn TokenCounter>, chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            counter,
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Use the conventional overlap of a tenth of the chunk size.
    pub fn with_default_overlap(counter: Arc<dyn TokenCounter>, chunk_size: usize) -> Self {
        Self::new(counter, chunk_size, chunk_size / 10)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut window_tokens = 0;

        for piece in text.split_inclusive(char::is_whitespace) {
            let tokens = self.counter.count(piece);
            if window_tokens + tokens > self.chunk_size && !window.is_empty() {
                chunks.push(join(&window));
                while window_tokens > self.chunk_overlap
                    || (window_tokens + tokens > self.chunk_size && !window.is_empty())
                {
                    let Some((_, dropped)) = window.pop_front() else {
                        break;
                    };
                    window_tokens -= dropped;
                }
            }
            window.push_back((piece, tokens));
            window_tokens += tokens;
        }

        if !window.is_empty() {
            chunks.push(join(&window));
        }
        chunks
    }

    /// Split into documents tagged with their chunk index.
    pub fn split_documents(&self, text: &str) -> Vec<Document> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(idx, chunk)| Document::new(chunk).with_metadata("chunk", idx.into()))
            .collect()
    }
}

fn join(window: &VecDeque<(&str, usize)>) -> String {
    window.iter().map(|(piece, _)| *piece).collect()
}
