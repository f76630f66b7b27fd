//! Web scraper tool — asks a hosted page-reading workflow a question.
//!
//! Input is `"<url>","<question>"`. The question and URL are posted to a
//! prediction endpoint (a Flowise-style chatflow) which fetches the page and
//! answers; an empty question asks for a summary.

use async_trait::async_trait;
use orchestra_core::command::Args;
use orchestra_core::error::ToolError;
use orchestra_core::tool::Tool;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_QUESTION: &str = "Provide a summary of the page";

pub struct WebScraperTool {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct PredictionResponse {
    #[serde(default)]
    text: Option<String>,
}

impl WebScraperTool {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

/// Split `"<url>","<question>"` into its two parts.
///
/// Each part is trimmed, loses one pair of surrounding quotes and a trailing
/// `/`. A missing question comes back empty.
pub fn parse_inputs(input: &str) -> (String, String) {
    let clean = |part: &str| {
        let t = part.trim();
        let t = t.strip_prefix('"').unwrap_or(t);
        let t = t.strip_suffix('"').unwrap_or(t);
        let t = t.strip_suffix('/').unwrap_or(t);
        t.trim().to_string()
    };

    let mut parts = input.split(',');
    let url = parts.next().map(clean).unwrap_or_default();
    let task = parts.next().map(clean).unwrap_or_default();
    (url, task)
}

#[async_trait]
impl Tool for WebScraperTool {
    fn name(&self) -> &str {
        "web-scraper"
    }

    fn description(&self) -> &str {
        "Use this tool when you have a url to a web page and want to have an agent answer a \
         question based on the content of the page. input should be a comma separated list of \
         \"ONE valid http URL including protocol\",\"what question you have for the page or \
         empty string for a summary\"."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "\"<url>\",\"<question>\""
                }
            },
            "required": ["input"]
        })
    }

    async fn execute(&self, arguments: Args) -> Result<String, ToolError> {
        let input = arguments
            .get("input")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'input' argument".into()))?;

        let (url, task) = parse_inputs(input);
        if url.is_empty() {
            return Err(ToolError::InvalidArguments("no URL given".into()));
        }
        let question = if task.is_empty() { DEFAULT_QUESTION } else { task.as_str() };

        tracing::debug!(%url, question, "Scraping page");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "question": question,
                "overrideConfig": { "url": url },
            }))
            .send()
            .await
            .map_err(|e| ToolError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("Got {} error from scraper workflow", status.as_u16()),
            });
        }

        let body: PredictionResponse =
            response.json().await.map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("Invalid response from scraper workflow: {e}"),
            })?;

        Ok(body
            .text
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "No result found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/predict")
    }

    fn input(s: &str) -> Args {
        json!({"input": s}).as_object().cloned().unwrap()
    }

    #[test]
    fn parse_inputs_strips_quotes_and_slash() {
        let (url, task) = parse_inputs(r#""https://example.com/", "what is this?""#);
        assert_eq!(url, "https://example.com");
        assert_eq!(task, "what is this?");
    }

    #[test]
    fn parse_inputs_without_question() {
        let (url, task) = parse_inputs("https://example.com");
        assert_eq!(url, "https://example.com");
        assert!(task.is_empty());
    }

    #[tokio::test]
    async fn posts_question_and_url() {
        let router = Router::new().route(
            "/predict",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["question"], "Provide a summary of the page");
                assert_eq!(body["overrideConfig"]["url"], "https://example.com");
                Json(json!({"text": "A page about examples."}))
            }),
        );
        let tool = WebScraperTool::new(serve(router).await);
        let output = tool.execute(input(r#""https://example.com/","""#)).await.unwrap();
        assert_eq!(output, "A page about examples.");
    }

    #[tokio::test]
    async fn empty_answer_is_reported() {
        let router = Router::new().route("/predict", post(|| async { Json(json!({"text": ""})) }));
        let tool = WebScraperTool::new(serve(router).await);
        let output = tool.execute(input("https://example.com")).await.unwrap();
        assert_eq!(output, "No result found");
    }

    #[tokio::test]
    async fn server_error_is_tool_error() {
        let router = Router::new().route(
            "/predict",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let tool = WebScraperTool::new(serve(router).await);
        let err = tool.execute(input("https://example.com")).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
