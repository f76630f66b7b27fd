//! Prompt construction: templates, token estimation and budgeted assembly.

pub mod builder;
pub mod template;
pub mod token;

pub use builder::{
    DEFAULT_HISTORY_WINDOW, DEFAULT_MEMORY_TOKEN_CEILING, DEFAULT_SEND_TOKEN_LIMIT, PromptBuilder,
    REPLY_RESERVE,
};
pub use template::Persona;
pub use token::{CharTokenCounter, estimate_tokens};
