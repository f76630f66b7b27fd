//! File write tool — create or overwrite a file in the agent's workspace.

use async_trait::async_trait;
use orchestra_core::command::Args;
use orchestra_core::error::ToolError;
use orchestra_core::tool::Tool;
use std::path::PathBuf;

use crate::workspace;

pub struct FileWriteTool {
    root: PathBuf,
}

impl FileWriteTool {
    /// Create a file write tool confined to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn failed(&self, reason: String) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason,
        }
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write file from disk"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "name of file"
                },
                "text": {
                    "type": "string",
                    "description": "text to write to file"
                }
            },
            "required": ["file_path", "text"]
        })
    }

    async fn execute(&self, arguments: Args) -> Result<String, ToolError> {
        let file_path = arguments
            .get("file_path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'file_path' argument".into()))?;

        let text = arguments
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;

        let path = workspace::resolve(&self.root, file_path, self.name())?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.failed(format!("Failed to create directories: {e}")))?;
        }

        tokio::fs::write(&path, text)
            .await
            .map_err(|e| self.failed(format!("Failed to write {file_path}: {e}")))?;

        tracing::debug!(path = %path.display(), bytes = text.len(), "File written");
        Ok("File written to successfully.".into())
    }
}
