// Error types for Brain module

use crate::process::ProcessError;
use thiserror::Error;

/// Runtime errors from the model backends
#[derive(Debug, Error)]
pub enum BrainError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("no text in response")]
    NoText,

    #[error("failed to parse output")]
    ParseFailed,

    #[error("malformed response: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("request build error: {0}")]
    RequestBuild(&'static str),

    #[error("gemini CLI exited with code {code}: {message}")]
    CliExit { code: i32, message: String },

    #[error("gemini CLI reported an error: {0}")]
    CliReported(String),

    #[error("cancelled by caller")]
    Cancelled,

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Initialization errors for Brain
#[derive(Debug, Error)]
pub enum BrainInitError {
    #[error("Failed to create HTTP client: {0}")]
    ClientError(#[from] reqwest::Error),
}
