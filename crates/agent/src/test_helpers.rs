//! Shared test helpers: scripted collaborators for the agent loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use orchestra_core::command::Args;
use orchestra_core::error::{MemoryError, ProviderError, ToolError};
use orchestra_core::human::HumanInput;
use orchestra_core::memory::{Document, MemoryRetriever, MemoryStore, MemoryWriter};
use orchestra_core::message::Message;
use orchestra_core::provider::ChatModel;
use orchestra_core::tool::Tool;
use tokio::sync::Notify;

/// Build string arguments from pairs.
pub fn args(pairs: &[(&str, &str)]) -> Args {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect()
}

/// A model that returns a sequence of scripted replies.
///
/// Each call to `complete` returns the next reply in the queue and records
/// the prompt it was given. Errors once the script runs out.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::EmptyResponse("script exhausted".into()))
    }
}

/// A model whose call never completes; `entered` fires when it is called.
#[derive(Default)]
pub struct HangingModel {
    pub entered: Arc<Notify>,
}

#[async_trait]
impl ChatModel for HangingModel {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _messages: &[Message]) -> Result<String, ProviderError> {
        self.entered.notify_one();
        std::future::pending().await
    }
}

/// A tool with a fixed result that records every call's arguments.
pub struct StaticTool {
    name: String,
    result: Result<String, String>,
    calls: Arc<Mutex<Vec<Args>>>,
}

impl StaticTool {
    pub fn ok(name: &str, output: &str) -> Self {
        Self {
            name: name.into(),
            result: Ok(output.into()),
            calls: Arc::default(),
        }
    }

    pub fn failing(name: &str, reason: &str) -> Self {
        Self {
            name: name.into(),
            result: Err(reason.into()),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<Args>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "A test tool"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "input": { "type": "string" } }
        })
    }

    async fn execute(&self, arguments: Args) -> Result<String, ToolError> {
        self.calls.lock().unwrap().push(arguments);
        self.result.clone().map_err(|reason| ToolError::ExecutionFailed {
            tool_name: self.name.clone(),
            reason,
        })
    }
}

/// Memory that returns fixed documents and records queries and writes.
#[derive(Default)]
pub struct RecordingMemory {
    recall: Vec<Document>,
    fail_recall: bool,
    queries: Mutex<Vec<String>>,
    written: Mutex<Vec<Document>>,
}

impl RecordingMemory {
    pub fn with_recall(docs: Vec<&str>) -> Self {
        Self {
            recall: docs.into_iter().map(Document::new).collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_recall: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn written(&self) -> Vec<Document> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl MemoryRetriever for RecordingMemory {
    async fn relevant(&self, query: &str) -> Result<Vec<Document>, MemoryError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail_recall {
            return Err(MemoryError::QueryFailed("index offline".into()));
        }
        Ok(self.recall.clone())
    }
}

#[async_trait]
impl MemoryWriter for RecordingMemory {
    async fn add_documents(&self, documents: Vec<Document>) -> Result<(), MemoryError> {
        self.written.lock().unwrap().extend(documents);
        Ok(())
    }
}

impl MemoryStore for RecordingMemory {
    fn name(&self) -> &str {
        "recording"
    }
}

/// A human who answers from a script and records the questions asked.
pub struct ScriptedHuman {
    answers: Mutex<VecDeque<Option<String>>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedHuman {
    pub fn new(answers: Vec<Option<&str>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(|a| a.map(String::from)).collect()),
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

#[async_trait]
impl HumanInput for ScriptedHuman {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn request(&self, question: &str) -> Option<String> {
        self.questions.lock().unwrap().push(question.to_string());
        self.answers.lock().unwrap().pop_front().flatten()
    }
}

/// A human who never answers.
pub struct SilentHuman;

#[async_trait]
impl HumanInput for SilentHuman {
    fn name(&self) -> &str {
        "silent"
    }

    async fn request(&self, _question: &str) -> Option<String> {
        std::future::pending().await
    }
}
