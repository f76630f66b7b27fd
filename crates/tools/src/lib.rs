//! Built-in tool implementations for Orchestra.
//!
//! Tools give the agent the ability to interact with the world:
//! read/write files in its workspace, find URLs with a web search,
//! and ask questions about a web page.

pub mod file_read;
pub mod file_write;
pub mod url_finder;
pub mod web_scraper;
mod workspace;

use orchestra_config::AppConfig;
use orchestra_core::tool::ToolRegistry;
use tracing::info;

pub use file_read::FileReadTool;
pub use file_write::FileWriteTool;
pub use url_finder::UrlFinderTool;
pub use web_scraper::WebScraperTool;

/// Create the default tool registry from configuration.
///
/// - File read/write: always available, confined to the workspace directory
/// - `url-finder`: only when a Serper API key is configured
/// - `web-scraper`: only when a scraper endpoint is configured
pub fn default_registry(config: &AppConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let workspace = config.workspace_dir();
    registry.register(Box::new(FileReadTool::new(&workspace)));
    registry.register(Box::new(FileWriteTool::new(&workspace)));

    match &config.tools.serper_api_key {
        Some(key) => registry.register(Box::new(UrlFinderTool::new(
            key,
            &config.tools.serper_gl,
            &config.tools.serper_hl,
        ))),
        None => info!("No Serper API key configured, url-finder disabled"),
    }

    match &config.tools.scraper_url {
        Some(url) => registry.register(Box::new(WebScraperTool::new(url))),
        None => info!("No scraper endpoint configured, web-scraper disabled"),
    }

    registry
}
