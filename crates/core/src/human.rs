//! Human-input channel — how the agent asks its operator a question.
//!
//! The reserved `request-human-input` command is routed here instead of to a
//! tool. The CLI answers from stdin; the gateway forwards the question over
//! the session's WebSocket and waits for a reply frame.

use async_trait::async_trait;

/// A channel to a human operator.
#[async_trait]
pub trait HumanInput: Send + Sync {
    /// Human-readable channel name (e.g., "stdin", "websocket").
    fn name(&self) -> &str;

    /// Ask `question` and wait for the answer.
    ///
    /// `None` means the channel closed without an answer. Callers bound the
    /// wait with their own timeout.
    async fn request(&self, question: &str) -> Option<String>;
}
