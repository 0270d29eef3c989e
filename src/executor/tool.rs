// Tool trait and description overrides

use crate::brain::ToolDefinition;
use crate::executor::{Result, ToolOutput};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Internal trait for tool implementations
#[async_trait]
pub trait ToolImpl: Send + Sync {
    /// Get the tool definition (name, description, parameters)
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with JSON input
    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput>;
}

/// Load description overrides from a TOML file: `[read_file] description = "..."`.
///
/// Only descriptions of catalog tools can be changed; unknown keys are ignored by the caller.
pub fn load_tool_descriptions(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        debug!(path = %path.display(), "tools.toml not found, using default descriptions");
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(path)?;
    let config: toml::Table = content.parse()?;

    let descriptions: HashMap<String, String> = config
        .iter()
        .filter_map(|(key, value)| {
            value
                .get("description")
                .and_then(|d| d.as_str())
                .map(|s| (key.clone(), s.to_string()))
        })
        .collect();

    debug!(path = %path.display(), tool_count = descriptions.len(), "loaded tool descriptions from config");
    Ok(descriptions)
}
