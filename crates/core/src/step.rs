//! Steps: one think-act-observe exchange each.
//!
//! A [`Step`] is recorded in the saved-step log as soon as the reply is
//! parsed (with `result` still empty) and completed in place once the
//! observation is known. A [`PendingStep`] is the replay form: supplied at
//! start or resume, its non-empty fields stand in for the model reply and
//! the tool result so neither has to be paid for again.

use serde::{Deserialize, Serialize};

use crate::command::Reply;

/// A recorded step of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    pub assistant_reply: String,
    pub parsed: Reply,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Step {
    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }
}

/// A previously recorded (possibly operator-edited) step queued for replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl PendingStep {
    /// The recorded reply, if there is a usable one.
    pub fn reply(&self) -> Option<&str> {
        non_empty(self.assistant_reply.as_deref())
    }

    /// The recorded result, if there is a usable one.
    pub fn recorded_result(&self) -> Option<&str> {
        non_empty(self.result.as_deref())
    }

    pub fn user_message(&self) -> Option<&str> {
        non_empty(self.user_message.as_deref())
    }
}

impl From<Step> for PendingStep {
    fn from(step: Step) -> Self {
        Self {
            user_message: step.user_message,
            assistant_reply: Some(step.assistant_reply),
            result: step.result,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
