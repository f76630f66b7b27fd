//! Plan drafting before a run.
//!
//! The operator writes a plan document (TBD elements, goals, description,
//! constraints, tools). [`Planner::clarify`] lets the model ask about
//! anything unclear; [`Planner::polish`] asks for the finished plan, keeps
//! only its fenced markdown, and restarts the conversation from it.

mod markdown;

pub use markdown::{PlanDocument, PlanSection, SectionBody, extract_fenced};

use std::sync::Arc;

use orchestra_core::error::ProviderError;
use orchestra_core::message::Message;
use orchestra_core::provider::ChatModel;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const FORMAT_EXPLANATION: &str = "\
The User will provide you with a Markdown document wrapped as a code block, which contains:
To-be-decided elements (under ## TBD),
GOALS (under ## Goals),
DESCRIPTION (under ## Description),
CONSTRAINTS (under ## Constraints),
and TOOLS (under ## Tools).
TBD contains a list of elements that are not decided yet, and will be provided before execution of the plan.
If you need to refer to a TBD element, you can use curly braces to refer to it, e.g. {location_of_user}.
TOOLS contains a list of tools and their descriptions that your fellow AI workers can use to achieve the goals.";

pub const CLARIFYING_PROMPT: &str = "Is there anything still unclear about the plan?";

pub const POLISHING_PROMPT: &str = "Please polish the plan based on the provided information and \
your conversation with me. Your response should be the polished plan in the exact same format as \
the Markdown document provided by me earlier.";

/// The model's answer once there is nothing left to ask.
pub const READY_REPLY: &str = "I believe we are ready to make a good plan";

pub fn system_prompt() -> String {
    format!(
        "You are PlannerGPT, an AI that helps User to create solid plans that can be executed later by your fellow AI workers.\n\
         {FORMAT_EXPLANATION}\n\
         The User may ask you to do the following:\n\
         1. Ask a question to clarify the plan, especially the TBD elements and description. In this case, your response should either be a question, or \"{READY_REPLY}\" if you believe there's no more unclear areas.\n\
         2. Polish the plan based on the provided information and your conversation with the User. Your response should be the polished plan in the exact same format as the Markdown document provided by the User, with an additional \"Steps\" part at the end.\n"
    )
}

/// Result of a polishing turn.
#[derive(Debug, Clone, PartialEq)]
pub struct PolishedPlan {
    /// The model's full reply.
    pub reply: String,
    /// The fenced plan markdown, if the reply had one.
    pub markdown: Option<String>,
}

impl PolishedPlan {
    pub fn document(&self) -> Option<PlanDocument> {
        self.markdown.as_deref().map(PlanDocument::parse)
    }
}

/// A planning conversation with one model. Turns are serialized.
pub struct Planner {
    model: Arc<dyn ChatModel>,
    conversation: Mutex<Vec<Message>>,
}

impl Planner {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            conversation: Mutex::new(vec![Message::system(system_prompt())]),
        }
    }

    /// Ask whether anything about `text` is unclear. Both sides of the
    /// exchange stay in the conversation.
    pub async fn clarify(&self, text: &str) -> Result<String, ProviderError> {
        let mut conversation = self.conversation.lock().await;
        let question = Message::human(format!("{text} \n{CLARIFYING_PROMPT}"));

        let mut messages = conversation.clone();
        messages.push(question.clone());
        let reply = self.model.complete(&messages).await?;

        conversation.push(question);
        conversation.push(Message::ai(reply.as_str()));
        debug!(turns = conversation.len(), "Planner clarified");
        Ok(reply)
    }

    /// Ask for the polished plan. The conversation restarts from the plan
    /// alone, so later turns refine it rather than the whole discussion.
    pub async fn polish(&self, text: &str) -> Result<PolishedPlan, ProviderError> {
        let mut conversation = self.conversation.lock().await;
        let request = Message::human(format!("{text} \n{POLISHING_PROMPT}"));

        let mut messages = conversation.clone();
        messages.push(request);
        let reply = self.model.complete(&messages).await?;

        let markdown = extract_fenced(&reply).map(String::from);
        if markdown.is_none() {
            warn!("Polished plan had no fenced block");
        }
        *conversation = vec![
            Message::system(system_prompt()),
            Message::human(format!("```\n{}```\n", markdown.as_deref().unwrap_or_default())),
        ];
        Ok(PolishedPlan { reply, markdown })
    }

    /// Drop the conversation, keeping only the system prompt and `seed`.
    pub async fn reset(&self, seed: Vec<Message>) {
        let mut conversation = self.conversation.lock().await;
        *conversation = std::iter::once(Message::system(system_prompt()))
            .chain(seed)
            .collect();
    }

    pub async fn conversation(&self) -> Vec<Message> {
        self.conversation.lock().await.clone()
    }
}
