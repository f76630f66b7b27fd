//! File read tool — read a file from the agent's workspace.

use async_trait::async_trait;
use orchestra_core::command::Args;
use orchestra_core::error::ToolError;
use orchestra_core::tool::Tool;
use std::path::PathBuf;

use crate::workspace;

pub struct FileReadTool {
    root: PathBuf,
}

impl FileReadTool {
    /// Create a file read tool confined to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read file from disk"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "name of file"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, arguments: Args) -> Result<String, ToolError> {
        let file_path = arguments
            .get("file_path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'file_path' argument".into()))?;

        let path = workspace::resolve(&self.root, file_path, self.name())?;

        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("Failed to read {file_path}: {e}"),
            })
    }
}
