// Error types for Process module

use thiserror::Error;

/// Process runner errors. A non-zero exit is not an error here; callers see it in `ProcessOutput`.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("cancelled by caller")]
    Cancelled,

    #[error("Failed to wait for process: {0}")]
    Wait(#[from] std::io::Error),
}
