//! Prompt assembly for one model call.
//!
//! Produces `[system, time, memory, ...history, input]`:
//!
//! 1. **System**: persona, numbered goals and the command block
//! 2. **Time**: current wall-clock time
//! 3. **Memory**: recalled documents, trimmed under the memory ceiling
//! 4. **History**: the newest messages that still fit the send budget
//! 5. **Input**: the human message for this iteration
//!
//! Only the memory retrieval suspends; everything else is pure given the
//! inputs and the injected clock.

use std::sync::Arc;

use chrono::{DateTime, Local};
use orchestra_core::memory::{Document, MemoryRetriever};
use orchestra_core::message::{Message, MessageView};
use orchestra_core::provider::TokenCounter;
use orchestra_core::tool::ToolRegistry;
use tracing::{debug, warn};

use super::template::{self, Persona};

/// Default prompt budget when the model's window is unknown.
pub const DEFAULT_SEND_TOKEN_LIMIT: usize = 4196;

/// Default budget for system, time and recalled memory together.
pub const DEFAULT_MEMORY_TOKEN_CEILING: usize = 2500;

/// Tokens held back from the send budget for the model's reply.
pub const REPLY_RESERVE: usize = 1000;

/// How many recent messages form the memory query.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

const MEMORY_PREAMBLE: &str = "This reminds you of these events from your past:\n";

pub struct PromptBuilder {
    persona: Persona,
    instructions: String,
    counter: Arc<dyn TokenCounter>,
    memory: Arc<dyn MemoryRetriever>,
    send_token_limit: usize,
    memory_token_ceiling: usize,
    history_window: usize,
    clock: fn() -> DateTime<Local>,
}

impl PromptBuilder {
    pub fn new(
        persona: Persona,
        tools: &ToolRegistry,
        human_in_the_loop: bool,
        counter: Arc<dyn TokenCounter>,
        memory: Arc<dyn MemoryRetriever>,
    ) -> Self {
        Self {
            persona,
            instructions: template::instructions(tools, human_in_the_loop),
            counter,
            memory,
            send_token_limit: DEFAULT_SEND_TOKEN_LIMIT,
            memory_token_ceiling: DEFAULT_MEMORY_TOKEN_CEILING,
            history_window: DEFAULT_HISTORY_WINDOW,
            clock: Local::now,
        }
    }

    pub fn with_send_token_limit(mut self, limit: usize) -> Self {
        self.send_token_limit = limit;
        self
    }

    pub fn with_memory_token_ceiling(mut self, ceiling: usize) -> Self {
        self.memory_token_ceiling = ceiling;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Replace the wall clock (tests pin it).
    pub fn with_clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    /// Assemble the messages for one model call.
    pub async fn build(&self, goals: &[String], history: &[Message], user_input: &str) -> Vec<Message> {
        let system = Message::system(template::system_prompt(
            &self.persona,
            goals,
            &self.instructions,
        ));
        let now = (self.clock)().format("%-m/%-d/%Y, %-I:%M:%S %p");
        let time = Message::system(format!("The current time and date is {now}"));

        let mut used = self.counter.count(&system.content) + self.counter.count(&time.content);

        let docs = self.recall(history).await;
        let docs = self.trim_memory(docs, used);
        let memory = Message::system(format!(
            "{MEMORY_PREAMBLE}{}\n\n",
            docs.iter()
                .map(|d| d.content.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        ));
        used += self.counter.count(&memory.content);

        let admitted = self.admit_history(history, used);
        debug!(
            used_tokens = used,
            memories = docs.len(),
            history = admitted.len(),
            of = history.len(),
            "Prompt assembled"
        );

        let mut messages = Vec::with_capacity(admitted.len() + 4);
        messages.push(system);
        messages.push(time);
        messages.push(memory);
        messages.extend(admitted.into_iter().cloned());
        messages.push(Message::human(user_input));
        messages
    }

    /// Ask memory about the most recent window of history.
    async fn recall(&self, history: &[Message]) -> Vec<Document> {
        let start = history.len().saturating_sub(self.history_window);
        let window: Vec<MessageView<'_>> = history[start..].iter().map(MessageView::from).collect();
        let query = serde_json::to_string(&window).unwrap_or_default();

        match self.memory.relevant(&query).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!("Memory recall failed, continuing without: {e}");
                Vec::new()
            }
        }
    }

    /// Drop the least relevant documents (from the tail) until
    /// `used + Σ tokens(doc)` is under the memory ceiling.
    fn trim_memory(&self, mut docs: Vec<Document>, used: usize) -> Vec<Document> {
        let mut total: usize = docs.iter().map(|d| self.counter.count(&d.content)).sum();
        while used + total >= self.memory_token_ceiling {
            let Some(dropped) = docs.pop() else {
                break;
            };
            total -= self.counter.count(&dropped.content);
            debug!(remaining = docs.len(), "Dropped memory over ceiling");
        }
        docs
    }

    /// Newest-first walk over the recent window that stops at the first
    /// message over budget. Returned in chronological order.
    fn admit_history<'a>(&self, history: &'a [Message], used: usize) -> Vec<&'a Message> {
        let budget = self.send_token_limit.saturating_sub(REPLY_RESERVE);
        let start = history.len().saturating_sub(self.history_window);
        let mut accumulated = 0;
        let mut admitted = Vec::new();
        for message in history[start..].iter().rev() {
            let tokens = self.counter.count(&message.content);
            if used + accumulated + tokens > budget {
                break;
            }
            accumulated += tokens;
            admitted.push(message);
        }
        admitted.reverse();
        admitted
    }
}
