//! Context window sizes of well-known models.

use tracing::warn;

/// Fallback context size for unknown chat models.
pub const DEFAULT_CONTEXT_SIZE: usize = 4097;

/// Prompt token budget used by the prompt builder when none is configured.
pub const DEFAULT_SEND_TOKEN_LIMIT: usize = 4196;

/// Total context window (prompt + completion) of a chat model.
pub fn model_context_size(model: &str) -> usize {
    let base = model.split(':').next().unwrap_or(model);
    match base {
        "gpt-3.5-turbo" | "gpt-3.5-turbo-0301" | "gpt-3.5-turbo-0613" => 4096,
        "gpt-3.5-turbo-16k" => 16384,
        "gpt-4-32k" | "gpt-4-32k-0314" | "gpt-4-32k-0613" => 32768,
        "gpt-4" | "gpt-4-0314" | "gpt-4-0613" => 8192,
        "text-davinci-003" => 4097,
        "text-curie-001" | "text-babbage-001" | "text-ada-001" => 2048,
        "code-davinci-002" => 8000,
        "code-cushman-001" => 2048,
        other => {
            warn!(model = other, "Unknown model, assuming {DEFAULT_CONTEXT_SIZE}-token context");
            DEFAULT_CONTEXT_SIZE
        }
    }
}

/// Maximum input tokens of an embedding model, used as the memory chunk size.
pub fn embedding_context_size(model: &str) -> usize {
    match model {
        "text-embedding-ada-002" => 8191,
        _ => 2046,
    }
}
