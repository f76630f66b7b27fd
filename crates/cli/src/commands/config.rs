//! `orchestra config` — Print the effective configuration.

use orchestra_config::AppConfig;

const REDACTED: &str = "[REDACTED]";

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("# {}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", render(&config)?);
    Ok(())
}

/// TOML rendering with secrets masked.
fn render(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some(REDACTED.into());
    }
    if shown.tools.serper_api_key.is_some() {
        shown.tools.serper_api_key = Some(REDACTED.into());
    }
    toml::to_string_pretty(&shown)
}
