//! WebSocket frames exchanged with a session.
//!
//! Both directions are JSON objects tagged by `type`.

use orchestra_agent::PlanDocument;
use orchestra_core::event::AgentUpdate;
use orchestra_core::step::PendingStep;
use serde::{Deserialize, Serialize};

/// Client → server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Start a run with a single goal.
    Input { content: String },

    /// Answer the outstanding human-input request.
    Reply { content: String },

    Pause,

    /// Continue a paused run, optionally replacing its pending steps.
    Resume {
        #[serde(default)]
        steps: Option<Vec<PendingStep>>,
    },

    Stop {
        #[serde(default)]
        reason: Option<String>,
    },

    /// Start a run that first replays `steps`.
    Restart {
        goals: Vec<String>,
        #[serde(default)]
        steps: Vec<PendingStep>,
    },

    /// Ask the planner what is still unclear about a plan draft.
    PlanClarify { content: String },

    /// Ask the planner for the finished plan.
    PlanPolish { content: String },
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Start { goals: Vec<String> },
    Update { update: AgentUpdate },
    RequestHumanInput { content: String },
    /// `None` when the run hit its iteration cap.
    FinalResponse { content: Option<String> },
    /// The planner's clarifying question, or its readiness message.
    PlanReply { content: String },
    /// A polished plan; `plan` is absent when the reply had no fenced block.
    Plan {
        content: String,
        plan: Option<PlanDocument>,
    },
    Error { message: String },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
