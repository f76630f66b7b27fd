//! The autonomous agent loop — the heart of Orchestra.
//!
//! The agent follows a **Think → Act → Observe** cycle:
//!
//! 1. **Build the prompt** (persona + goals + commands, time, recalled
//!    memory, as much recent history as the budget allows)
//! 2. **Ask the model** for one JSON command
//! 3. **Parse** the reply, rescuing malformed JSON where possible
//! 4. **Dispatch** the command to a tool or the human operator
//! 5. **Observe**: record the result, write it to memory, loop back
//!
//! The loop ends when the model issues `finish`, the operator exits, the
//! run is stopped, or the iteration cap is reached.

pub mod control;
pub mod dispatcher;
pub mod error;
pub mod loop_runner;
pub mod parser;
pub mod planner;
pub mod prompt;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use control::{CancelSignal, PauseGate};
pub use dispatcher::{DispatchOutcome, ToolDispatcher};
pub use error::AgentError;
pub use loop_runner::{
    AgentLoop, AgentLoopBuilder, NEXT_STEP_INPUT, RunClaim, RunContext, build_memory,
};
pub use parser::OutputParser;
pub use planner::{PlanDocument, Planner, PolishedPlan};
pub use prompt::{CharTokenCounter, Persona, PromptBuilder};
pub use registry::{RunGuard, RunRegistry};
