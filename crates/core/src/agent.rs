//! Agent lifecycle state and run outcomes.

use serde::{Deserialize, Serialize};

/// Sentinel returned when the operator asked the run to stop.
pub const EXIT_SENTINEL: &str = "EXITING";

/// Sentinel returned when the operator gave no answer in time.
pub const NO_INPUT_SENTINEL: &str = "EXITING (no human input received)";

/// Lifecycle of an agent loop.
///
/// `idle -> running -> {paused <-> running} -> {finished | stopped}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Finished,
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Finished)
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Why the operator ended a run through the human-input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanExit {
    /// Replied `stop` or `quit`
    Requested,
    /// Empty reply, closed channel or timeout
    NoInput,
}

impl HumanExit {
    pub fn sentinel(&self) -> &'static str {
        match self {
            Self::Requested => EXIT_SENTINEL,
            Self::NoInput => NO_INPUT_SENTINEL,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model issued `finish`; carries `args.response`.
    Finished { answer: String },
    /// The operator ended the run.
    Exited { exit: HumanExit },
    /// The run was cancelled.
    Stopped { reason: Option<String> },
    /// The iteration cap was reached without an answer.
    Exhausted,
}

impl RunOutcome {
    /// The outcome as delivered to the run's caller: the answer, a sentinel,
    /// a stop notice, or nothing on exhaustion.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Finished { answer } => Some(answer.clone()),
            Self::Exited { exit } => Some(exit.sentinel().to_string()),
            Self::Stopped { reason } => Some(format!(
                "Stopped with reason: {}",
                reason.as_deref().unwrap_or("Unknown")
            )),
            Self::Exhausted => None,
        }
    }

    /// The state the agent settles in after this outcome.
    pub fn final_state(&self) -> AgentState {
        match self {
            Self::Stopped { .. } => AgentState::Stopped,
            _ => AgentState::Finished,
        }
    }
}
