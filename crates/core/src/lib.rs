//! # Orchestra Core
//!
//! Domain types, traits, and error definitions for the Orchestra autonomous
//! agent runtime. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is defined as a trait here: the chat
//! model, the token counter, long-term memory, tools and the human-input
//! channel. Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod command;
pub mod step;
pub mod provider;
pub mod tool;
pub mod memory;
pub mod human;
pub mod agent;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{MemoryError, ProviderError, ToolError};
pub use message::{Message, MessageView, Role};
pub use command::{Args, Command, Reply};
pub use step::{PendingStep, Step};
pub use provider::{ChatModel, TokenCounter};
pub use tool::{Tool, ToolRegistry};
pub use memory::{Document, MemoryRetriever, MemoryStore, MemoryWriter};
pub use human::HumanInput;
pub use agent::{AgentState, HumanExit, RunOutcome};
pub use event::{AgentUpdate, Subscription, UpdateBus};
