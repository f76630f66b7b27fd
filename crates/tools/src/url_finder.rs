//! URL finder tool — web search through the Serper API.
//!
//! Posts the query to `https://google.serper.dev/search` and returns the
//! organic result links as a comma-separated list.

use async_trait::async_trait;
use orchestra_core::command::Args;
use orchestra_core::error::ToolError;
use orchestra_core::tool::Tool;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";

pub struct UrlFinderTool {
    api_key: String,
    endpoint: String,
    gl: String,
    hl: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    gl: &'a str,
    hl: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Deserialize)]
struct OrganicResult {
    link: String,
}

impl UrlFinderTool {
    pub fn new(api_key: impl Into<String>, gl: impl Into<String>, hl: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            api_key: api_key.into(),
            endpoint: SERPER_ENDPOINT.into(),
            gl: gl.into(),
            hl: hl.into(),
            client,
        }
    }

    /// Point the tool at a different search endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Tool for UrlFinderTool {
    fn name(&self) -> &str {
        "url-finder"
    }

    fn description(&self) -> &str {
        "a tool useful for when you need to find URLs on the Internet given a search query. \
         input should be a search query. outputs a comma separated list of URLs."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["input"]
        })
    }

    async fn execute(&self, arguments: Args) -> Result<String, ToolError> {
        let query = arguments
            .get("input")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'input' argument".into()))?;

        debug!(query, "Searching");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest {
                q: query,
                gl: &self.gl,
                hl: &self.hl,
            })
            .send()
            .await
            .map_err(|e| ToolError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("Got {} error from serper", status.as_u16()),
            });
        }

        let body: SearchResponse = response.json().await.map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: format!("Invalid response from serper: {e}"),
        })?;

        if body.organic.is_empty() {
            return Ok("No good search result found".into());
        }

        Ok(body
            .organic
            .into_iter()
            .map(|r| r.link)
            .collect::<Vec<_>>()
            .join(","))
    }
}
