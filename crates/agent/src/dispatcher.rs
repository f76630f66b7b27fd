//! Tool dispatcher — executes a parsed command and renders the observation.
//!
//! Dispatch never fails: tool errors, unknown names and parser errors all
//! become observation text the model can react to. The only terminal
//! outcome is the operator ending the run through the human-input command.

use std::sync::Arc;
use std::time::Duration;

use orchestra_core::agent::HumanExit;
use orchestra_core::command::{Command, HUMAN_INPUT_COMMAND};
use orchestra_core::human::HumanInput;
use orchestra_core::tool::ToolRegistry;
use tracing::{debug, info, warn};

/// Default wait for an operator answer.
pub const DEFAULT_HUMAN_INPUT_TIMEOUT: Duration = Duration::from_secs(120);

/// What executing a command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Text fed back to the model
    Observation(String),
    /// The operator ended the run
    Exit(HumanExit),
}

pub struct ToolDispatcher {
    tools: Arc<ToolRegistry>,
    human: Option<Arc<dyn HumanInput>>,
    human_timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            human: None,
            human_timeout: DEFAULT_HUMAN_INPUT_TIMEOUT,
        }
    }

    /// Route `request-human-input` to `human`, waiting at most `timeout`.
    pub fn with_human_input(mut self, human: Arc<dyn HumanInput>, timeout: Duration) -> Self {
        self.human = Some(human);
        self.human_timeout = timeout;
        self
    }

    pub async fn dispatch(&self, command: &Command) -> DispatchOutcome {
        if command.is_error() {
            return DispatchOutcome::Observation(format!("Error: {}. ", command.display_args()));
        }

        if command.name == HUMAN_INPUT_COMMAND
            && let Some(human) = &self.human
        {
            return self.ask_human(human.as_ref(), command).await;
        }

        let Some(tool) = self.tools.get(&command.name) else {
            debug!(command = %command.name, "Unknown command");
            return DispatchOutcome::Observation(format!(
                "Unknown command '{}'. Please refer to the 'COMMANDS' list for available commands and only respond in the specified JSON format.",
                command.name
            ));
        };

        debug!(command = %command.name, "Executing tool");
        let observation = match tool.execute(command.args.clone()).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %command.name, error = %e, "Tool execution failed");
                format!("Error: {e}")
            }
        };
        DispatchOutcome::Observation(format!("Command {} returned: {observation}", command.name))
    }

    async fn ask_human(&self, human: &dyn HumanInput, command: &Command) -> DispatchOutcome {
        let question = command.arg_str("input").unwrap_or_default();
        info!(channel = human.name(), "Requesting human input");

        let answer = match tokio::time::timeout(self.human_timeout, human.request(question)).await {
            Ok(answer) => answer,
            Err(_) => {
                warn!(timeout_secs = self.human_timeout.as_secs(), "Human input timed out");
                None
            }
        };

        match answer.as_deref().map(str::trim) {
            None | Some("") => DispatchOutcome::Exit(HumanExit::NoInput),
            Some("stop" | "quit") => DispatchOutcome::Exit(HumanExit::Requested),
            Some(reply) => DispatchOutcome::Observation(format!(
                "Command {HUMAN_INPUT_COMMAND} returned: {reply}"
            )),
        }
    }
}
