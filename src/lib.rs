// gemini-bridge - one execution interface over the Gemini API and the Gemini CLI,
// served to MCP clients over stdio or HTTP

pub mod agent;
pub mod auth;
pub mod brain;
pub mod bridge;
pub mod comm;
pub mod config;
pub mod executor;
pub mod parser;
pub mod process;
