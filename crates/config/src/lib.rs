//! Configuration loading, validation, and management for Orchestra.
//!
//! Loads configuration from `~/.orchestra/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.orchestra/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the chat model endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per LLM response (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_tokens: Option<u32>,

    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Built-in tool configuration
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("memory", &self.memory)
            .field("tools", &self.tools)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Settings for the think-act-observe loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Name the agent introduces itself with
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Role line following the name in the system prompt
    #[serde(default = "default_agent_role")]
    pub role: String,

    /// Iteration cap per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Prompt token budget; the model's context window when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_token_limit: Option<usize>,

    /// Ceiling for prompt plus retrieved memory tokens
    #[serde(default = "default_memory_token_ceiling")]
    pub memory_token_ceiling: usize,

    /// Number of recent messages considered for the prompt and memory query
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Offer the `request-human-input` command to the model
    #[serde(default = "default_true")]
    pub human_in_the_loop: bool,

    /// Honour recorded replies/results in pending steps
    #[serde(default = "default_true")]
    pub replay_supported: bool,

    /// How long to wait for an operator answer
    #[serde(default = "default_human_input_timeout_secs")]
    pub human_input_timeout_secs: u64,
}

fn default_agent_name() -> String {
    "MetaAgent".into()
}
fn default_agent_role() -> String {
    "an Assistant to help user achieve their goals".into()
}
fn default_max_iterations() -> u32 {
    10
}
fn default_memory_token_ceiling() -> usize {
    2500
}
fn default_history_window() -> usize {
    10
}
fn default_human_input_timeout_secs() -> u64 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            role: default_agent_role(),
            max_iterations: default_max_iterations(),
            send_token_limit: None,
            memory_token_ceiling: default_memory_token_ceiling(),
            history_window: default_history_window(),
            human_in_the_loop: true,
            replay_supported: true,
            human_input_timeout_secs: default_human_input_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "in_memory" or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Documents returned per recall
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,

    /// Embedding model whose context size bounds memory chunks
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Chunk size in tokens; derived from the embedding model when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,

    /// Tokens shared between consecutive chunks; a tenth of the chunk when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_overlap: Option<usize>,
}

fn default_memory_backend() -> String {
    "in_memory".into()
}
fn default_recall_limit() -> usize {
    4
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            recall_limit: default_recall_limit(),
            embedding_model: default_embedding_model(),
            chunk_size: None,
            chunk_overlap: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Root directory for file tools; `~/.orchestra/workspace` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_dir: Option<PathBuf>,

    /// Serper API key for `url-finder`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serper_api_key: Option<String>,

    /// Search country
    #[serde(default = "default_serper_gl")]
    pub serper_gl: String,

    /// Search language
    #[serde(default = "default_serper_hl")]
    pub serper_hl: String,

    /// Prediction endpoint for `web-scraper`; the tool is disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraper_url: Option<String>,
}

fn default_serper_gl() -> String {
    "us".into()
}
fn default_serper_hl() -> String {
    "en".into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            workspace_dir: None,
            serper_api_key: None,
            serper_gl: default_serper_gl(),
            serper_hl: default_serper_hl(),
            scraper_url: None,
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("workspace_dir", &self.workspace_dir)
            .field("serper_api_key", &redact(&self.serper_api_key))
            .field("serper_gl", &self.serper_gl)
            .field("serper_hl", &self.serper_hl)
            .field("scraper_url", &self.scraper_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3044
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.orchestra/config.toml).
    ///
    /// Environment variables override the file:
    /// - `ORCHESTRA_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `ORCHESTRA_MODEL`, `ORCHESTRA_API_URL`
    /// - `SERPER_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ORCHESTRA_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            self.api_key = lookup("OPENAI_API_KEY");
        }

        if let Some(model) = lookup("ORCHESTRA_MODEL") {
            self.default_model = model;
        }

        if let Some(url) = lookup("ORCHESTRA_API_URL") {
            self.api_url = url;
        }

        if self.tools.serper_api_key.is_none() {
            self.tools.serper_api_key = lookup("SERPER_API_KEY");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".orchestra")
    }

    /// The directory file tools operate in.
    pub fn workspace_dir(&self) -> PathBuf {
        self.tools
            .workspace_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("workspace"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if let Some(limit) = self.agent.send_token_limit
            && limit <= 1000
        {
            return Err(ConfigError::ValidationError(
                "agent.send_token_limit must leave room for the 1000-token reply reserve".into(),
            ));
        }

        if !matches!(self.memory.backend.as_str(), "in_memory" | "none") {
            return Err(ConfigError::ValidationError(format!(
                "unknown memory backend '{}' (expected \"in_memory\" or \"none\")",
                self.memory.backend
            )));
        }

        if let (Some(size), Some(overlap)) = (self.memory.chunk_size, self.memory.chunk_overlap)
            && overlap >= size
        {
            return Err(ConfigError::ValidationError(
                "memory.chunk_overlap must be smaller than memory.chunk_size".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: None,
            agent: AgentConfig::default(),
            memory: MemoryConfig::default(),
            tools: ToolsConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_model, "gpt-4");
        assert_eq!(config.agent.name, "MetaAgent");
        assert_eq!(config.agent.memory_token_ceiling, 2500);
        assert_eq!(config.agent.human_input_timeout_secs, 120);
        assert_eq!(config.gateway.port, 3044);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_model, config.default_model);
        assert_eq!(parsed.agent.max_iterations, config.agent.max_iterations);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn tiny_send_limit_rejected() {
        let mut config = AppConfig::default();
        config.agent.send_token_limit = Some(800);
        assert!(config.validate().is_err());
        config.agent.send_token_limit = Some(4196);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_memory_backend_rejected() {
        let mut config = AppConfig::default();
        config.memory.backend = "sqlite".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sqlite"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = AppConfig::default();
        config.memory.chunk_size = Some(100);
        config.memory.chunk_overlap = Some(100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_model, "gpt-4");
    }

    #[test]
    fn load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_model = "gpt-3.5-turbo"

[agent]
name = "Planner"
max_iterations = 25
human_in_the_loop = false

[tools]
scraper_url = "http://localhost:3000/api/v1/prediction/abc"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model, "gpt-3.5-turbo");
        assert_eq!(config.agent.name, "Planner");
        assert_eq!(config.agent.max_iterations, 25);
        assert!(!config.agent.human_in_the_loop);
        assert!(config.agent.replay_supported);
        assert_eq!(config.agent.role, "an Assistant to help user achieve their goals");
        assert!(config.tools.scraper_url.is_some());
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "agent = [not toml").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_take_priority() {
        let env: HashMap<&str, &str> = [
            ("ORCHESTRA_API_KEY", "sk-orchestra"),
            ("OPENAI_API_KEY", "sk-openai"),
            ("ORCHESTRA_MODEL", "gpt-4-32k"),
            ("SERPER_API_KEY", "serper"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("sk-orchestra"));
        assert_eq!(config.default_model, "gpt-4-32k");
        assert_eq!(config.tools.serper_api_key.as_deref(), Some("serper"));
    }

    #[test]
    fn openai_key_only_fills_missing_key() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env_overrides(|k| (k == "OPENAI_API_KEY").then(|| "sk-openai".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));

        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| (k == "OPENAI_API_KEY").then(|| "sk-openai".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("sk-openai"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        config.tools.serper_api_key = Some("serper-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("serper-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn workspace_dir_prefers_configured_path() {
        let mut config = AppConfig::default();
        assert!(config.workspace_dir().ends_with(".orchestra/workspace"));
        config.tools.workspace_dir = Some(PathBuf::from("/srv/agent"));
        assert_eq!(config.workspace_dir(), PathBuf::from("/srv/agent"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("MetaAgent"));
        assert!(toml_str.contains("3044"));
    }
}
