// Executor configuration

use crate::config::{env_path, parse_env_var};
use std::path::PathBuf;

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Sandbox root; every tool path must resolve inside it
    pub workspace_root: PathBuf,
    /// Optional description overrides for the fixed catalog
    pub tools_toml_path: PathBuf,
    /// Maximum matches returned by `search_text`
    pub search_max_matches: usize,
    /// Maximum directory levels below the search root
    pub search_max_depth: usize,
    /// Maximum bytes returned by `read_file`
    pub read_max_bytes: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            tools_toml_path: PathBuf::from("tools.toml"),
            search_max_matches: 20,
            search_max_depth: 5,
            read_max_bytes: 256 * 1024,
        }
    }
}

impl ExecutorConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Some(root) = env_path("WORKSPACE_ROOT") {
            config.workspace_root = root;
        }
        if let Some(path) = env_path("TOOLS_TOML_PATH") {
            config.tools_toml_path = path;
        }
        config.search_max_matches = parse_env_var("SEARCH_MAX_MATCHES", config.search_max_matches);
        config.search_max_depth = parse_env_var("SEARCH_MAX_DEPTH", config.search_max_depth);
        config.read_max_bytes = parse_env_var("READ_MAX_BYTES", config.read_max_bytes);
        config
    }
}
