// Brain module - the two model backends: direct HTTP and the Gemini CLI

pub mod builder;
pub mod cli;
pub mod client;
pub mod error;
pub mod types;

pub use builder::RequestBuilder;
pub use cli::{GeminiCli, OutputFormat};
pub use client::GeminiClient;
pub use error::{BrainError, BrainInitError};
pub use types::{
    Content, FunctionCall, FunctionResponse, GenerateContentRequest, GenerateContentResponse,
    Part, Role, Tool, ToolDefinition,
};

use crate::config::{env_path, env_string, install_dir, parse_env_var};
use std::path::PathBuf;

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Direct HTTP backend configuration
#[derive(Debug, Clone)]
pub struct BrainConfig {
    /// API base URL
    pub api_base: String,
    /// Default model identifier
    pub default_model: String,
    /// Default request timeout in milliseconds
    pub default_timeout_ms: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_timeout_ms: 120_000,
            connect_timeout_secs: 10,
        }
    }
}

impl BrainConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Some(base) = env_string("GEMINI_API_BASE") {
            config.api_base = base;
        }
        if let Some(model) = env_string("GEMINI_MODEL") {
            config.default_model = model;
        }
        config.default_timeout_ms = parse_env_var("GEMINI_TIMEOUT_MS", config.default_timeout_ms);
        config.connect_timeout_secs =
            parse_env_var("GEMINI_CONNECT_TIMEOUT_SECS", config.connect_timeout_secs);
        config
    }
}

/// CLI backend configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Explicit path to the CLI executable
    pub cli_path: Option<PathBuf>,
    /// Directory searched for a vendored `node_modules/.bin/gemini`
    pub install_dir: Option<PathBuf>,
    /// Package runner used when nothing local is found
    pub package_runner: String,
    /// Published package name
    pub package: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            cli_path: None,
            install_dir: None,
            package_runner: "npx".to_string(),
            package: "@google/gemini-cli".to_string(),
        }
    }
}

impl CliConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self {
            cli_path: env_path("GEMINI_CLI_PATH"),
            install_dir: install_dir(),
            ..Self::default()
        };
        if let Some(runner) = env_string("GEMINI_CLI_RUNNER") {
            config.package_runner = runner;
        }
        if let Some(package) = env_string("GEMINI_CLI_PACKAGE") {
            config.package = package;
        }
        config
    }
}
