//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world:
//! read/write files, search the web, scrape a page, etc. Every tool is
//! advertised to the model in the prompt's command list and invoked by name.

use async_trait::async_trait;

use crate::command::Args;
use crate::error::ToolError;

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file", "url-finder").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool and return its observation text.
    async fn execute(&self, arguments: Args) -> Result<String, ToolError>;

    /// The argument shape shown to the model: each parameter name mapped to
    /// its JSON type, e.g. `{"file_path": "string"}`.
    fn args_shape(&self) -> serde_json::Value {
        let schema = self.parameters_schema();
        let shape = schema
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| {
                        let ty = prop.get("type").and_then(|t| t.as_str()).unwrap_or("string");
                        (name.clone(), serde_json::Value::String(ty.to_string()))
                    })
                    .collect::<serde_json::Map<_, _>>()
            })
            .unwrap_or_default();
        serde_json::Value::Object(shape)
    }
}

/// An ordered registry of available tools.
///
/// Order is registration order so the rendered command list is stable.
/// Registering a name that already exists replaces the earlier tool in place:
/// later entries win.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// Iterate tools in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Box<dyn Tool>> for ToolRegistry {
    fn from_iter<I: IntoIterator<Item = Box<dyn Tool>>>(iter: I) -> Self {
        let mut registry = Self::new();
        for tool in iter {
            registry.register(tool);
        }
        registry
    }
}
