//! Model traits — the abstraction over LLM backends and token accounting.
//!
//! A [`ChatModel`] turns an ordered message list into reply text. A
//! [`TokenCounter`] measures text against the prompt budget. Both are
//! supplied to the agent loop by its owner.
//!
//! Implementations: OpenAI-compatible endpoints, scripted models in tests.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::message::Message;

/// A chat-completion backend.
///
/// Cancellation is cooperative: the caller races the returned future against
/// its cancellation token and drops it when the run is stopped.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier (e.g., "gpt-4").
    fn name(&self) -> &str;

    /// Send the prompt and return the raw reply text.
    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError>;
}

/// Counts tokens in a piece of text.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;

    /// Total tokens of several messages' content.
    fn count_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.count(&m.content)).sum()
    }
}
