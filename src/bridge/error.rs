// Error taxonomy of the execution core and transport

use crate::brain::cli::SIGN_IN_HINT;
use crate::brain::{BrainError, BrainInitError};
use crate::executor::ExecutorError;
use crate::process::ProcessError;
use serde::Serialize;
use thiserror::Error;

/// Copyable failure tag carried by `ExecutionResult::Failure`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    NoCredential,
    InvalidCredential,
    RateLimited,
    NetworkError,
    ProcessSpawnError,
    ProcessTimeout,
    ProcessNonZeroExit,
    ParseFailure,
    ToolSandboxViolation,
    CapacityExceeded,
    InvalidHost,
    InvalidRequest,
    Cancelled,
}

/// Everything that can end a request without an answer
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(
        "no authentication available: set GEMINI_API_KEY, write GEMINI_API_KEY=<key> to {credential_file}, or {hint}",
        hint = SIGN_IN_HINT
    )]
    NoCredential { credential_file: String },

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    ProcessSpawn(String),

    #[error("timed out after {0}ms")]
    ProcessTimeout(u64),

    #[error("{message}")]
    ProcessNonZeroExit { code: i32, message: String },

    #[error("{0}")]
    ParseFailure(String),

    #[error("{0}")]
    ToolSandboxViolation(String),

    #[error("server at capacity ({0} sessions)")]
    CapacityExceeded(usize),

    #[error("Invalid Host header: {0}")]
    InvalidHost(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("cancelled by caller")]
    Cancelled,
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::NoCredential { .. } => ErrorKind::NoCredential,
            BridgeError::InvalidCredential(_) => ErrorKind::InvalidCredential,
            BridgeError::RateLimited(_) => ErrorKind::RateLimited,
            BridgeError::Network(_) => ErrorKind::NetworkError,
            BridgeError::ProcessSpawn(_) => ErrorKind::ProcessSpawnError,
            BridgeError::ProcessTimeout(_) => ErrorKind::ProcessTimeout,
            BridgeError::ProcessNonZeroExit { .. } => ErrorKind::ProcessNonZeroExit,
            BridgeError::ParseFailure(_) => ErrorKind::ParseFailure,
            BridgeError::ToolSandboxViolation(_) => ErrorKind::ToolSandboxViolation,
            BridgeError::CapacityExceeded(_) => ErrorKind::CapacityExceeded,
            BridgeError::InvalidHost(_) => ErrorKind::InvalidHost,
            BridgeError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            BridgeError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BridgeError::ProcessNonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<ProcessError> for BridgeError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Timeout(ms) => BridgeError::ProcessTimeout(ms),
            ProcessError::Cancelled => BridgeError::Cancelled,
            other @ (ProcessError::SpawnFailed { .. } | ProcessError::Wait(_)) => {
                BridgeError::ProcessSpawn(other.to_string())
            }
        }
    }
}

impl From<BrainError> for BridgeError {
    fn from(err: BrainError) -> Self {
        match err {
            BrainError::InvalidCredential(m) => BridgeError::InvalidCredential(m),
            BrainError::RateLimited(m) => BridgeError::RateLimited(m),
            BrainError::InvalidRequest(m) => BridgeError::InvalidRequest(m),
            BrainError::RequestBuild(m) => BridgeError::InvalidRequest(m.to_string()),
            e @ (BrainError::Api { .. } | BrainError::Timeout(_) | BrainError::Network(_)) => {
                BridgeError::Network(e.to_string())
            }
            e @ (BrainError::NoText | BrainError::ParseFailed | BrainError::Serialization(_)) => {
                BridgeError::ParseFailure(e.to_string())
            }
            BrainError::CliExit { code, message } => BridgeError::ProcessNonZeroExit {
                code,
                message: format!("gemini CLI exited with code {}: {}", code, message),
            },
            BrainError::CliReported(message) => classify_reported(message),
            BrainError::Cancelled => BridgeError::Cancelled,
            BrainError::Process(e) => e.into(),
        }
    }
}

/// API failures the CLI prints as a JSON error body with a zero exit.
fn classify_reported(message: String) -> BridgeError {
    let lower = message.to_lowercase();
    if lower.contains("429") || lower.contains("quota") || lower.contains("rate limit") {
        BridgeError::RateLimited(message)
    } else if lower.contains("auth") || lower.contains("credential") || lower.contains("permission") {
        BridgeError::InvalidCredential(format!("{} ({})", message, SIGN_IN_HINT))
    } else {
        BridgeError::Network(format!("gemini CLI reported an error: {}", message))
    }
}

/// Startup errors
#[derive(Debug, Error)]
pub enum BridgeInitError {
    #[error(transparent)]
    Brain(#[from] BrainInitError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}
