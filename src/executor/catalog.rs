// Fixed tool catalog

use crate::brain::ToolDefinition;
use crate::executor::config::ExecutorConfig;
use crate::executor::error::{ExecutorError, Result};
use crate::executor::fs::{ListDirectoryTool, ReadFileTool, SearchTextTool};
use crate::executor::sandbox::Sandbox;
use crate::executor::tool::{load_tool_descriptions, ToolImpl};
use crate::executor::types::ToolOutput;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sandboxed executor for the read-only filesystem tools.
///
/// The catalog is fixed at construction; nothing registers tools at runtime.
pub struct Executor {
    sandbox: Arc<Sandbox>,
    tools: BTreeMap<&'static str, Arc<dyn ToolImpl>>,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        let sandbox = Arc::new(Sandbox::new(&config.workspace_root)?);

        let mut descriptions = match load_tool_descriptions(&config.tools_toml_path) {
            Ok(d) => d,
            Err(e) => {
                warn!(
                    path = %config.tools_toml_path.display(),
                    error = %e,
                    "ignoring unreadable tool descriptions"
                );
                Default::default()
            }
        };

        let mut tools: BTreeMap<&'static str, Arc<dyn ToolImpl>> = BTreeMap::new();
        tools.insert(
            ReadFileTool::NAME,
            Arc::new(ReadFileTool::new(
                sandbox.clone(),
                descriptions.remove(ReadFileTool::NAME),
                config.read_max_bytes,
            )),
        );
        tools.insert(
            ListDirectoryTool::NAME,
            Arc::new(ListDirectoryTool::new(
                sandbox.clone(),
                descriptions.remove(ListDirectoryTool::NAME),
            )),
        );
        tools.insert(
            SearchTextTool::NAME,
            Arc::new(SearchTextTool::new(
                sandbox.clone(),
                descriptions.remove(SearchTextTool::NAME),
                config.search_max_matches,
                config.search_max_depth,
            )),
        );

        for unknown in descriptions.keys() {
            debug!(tool = %unknown, "description override for unknown tool ignored");
        }

        info!(
            workspace_root = %sandbox.root().display(),
            tool_count = tools.len(),
            "executor initialized with tools"
        );

        Ok(Self { sandbox, tools })
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Definitions in stable name order
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Execute a tool by name with JSON input
    pub async fn execute(&self, tool_name: &str, input: serde_json::Value) -> Result<ToolOutput> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ExecutorError::UnknownTool(tool_name.to_string()))?;

        info!(tool_name = %tool_name, "executing tool");
        tool.run(input).await
    }
}
