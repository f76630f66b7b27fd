//! Chat model implementations for Orchestra.
//!
//! All models implement the `orchestra_core::ChatModel` trait.
//! [`build_model`] creates the configured one.

pub mod context;
pub mod openai_compat;

use orchestra_config::AppConfig;
use orchestra_core::error::ProviderError;
use orchestra_core::provider::ChatModel;
use std::sync::Arc;

pub use context::{DEFAULT_SEND_TOKEN_LIMIT, embedding_context_size, model_context_size};
pub use openai_compat::OpenAiCompatProvider;

/// Build the chat model described by the configuration.
///
/// The hosted OpenAI endpoint requires an API key; self-hosted
/// OpenAI-compatible endpoints may run without one.
pub fn build_model(config: &AppConfig) -> Result<Arc<dyn ChatModel>, ProviderError> {
    let api_key = match (&config.api_key, config.api_url.contains("api.openai.com")) {
        (Some(key), _) => key.clone(),
        (None, false) => String::new(),
        (None, true) => {
            return Err(ProviderError::NotConfigured(
                "no API key: set api_key in config.toml or ORCHESTRA_API_KEY".into(),
            ));
        }
    };

    let model = OpenAiCompatProvider::new(&config.api_url, api_key, &config.default_model)
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens);
    Ok(Arc::new(model))
}

/// The prompt token budget: the configured limit, else the model's window.
pub fn send_token_limit(config: &AppConfig) -> usize {
    config
        .agent
        .send_token_limit
        .unwrap_or_else(|| model_context_size(&config.default_model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosted_openai_requires_key() {
        let err = build_model(&AppConfig::default()).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn local_endpoint_needs_no_key() {
        let config = AppConfig {
            api_url: "http://localhost:11434/v1".into(),
            default_model: "llama3".into(),
            ..AppConfig::default()
        };
        let model = build_model(&config).unwrap();
        assert_eq!(model.name(), "llama3");
    }

    #[test]
    fn send_limit_prefers_configuration() {
        let mut config = AppConfig::default();
        assert_eq!(send_token_limit(&config), 8192);
        config.agent.send_token_limit = Some(3000);
        assert_eq!(send_token_limit(&config), 3000);
    }
}
