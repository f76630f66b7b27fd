//! Control-surface errors of the agent loop.
//!
//! Malformed replies, unknown commands and tool failures never surface here;
//! they are fed back to the model as observations.

use orchestra_core::error::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent is already running")]
    AlreadyRunning,

    #[error("Session {0} already has an active run")]
    SessionBusy(String),

    #[error("Model call failed: {0}")]
    Provider(#[from] ProviderError),
}
