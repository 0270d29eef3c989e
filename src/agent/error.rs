// Agent errors

use crate::brain::BrainError;
use thiserror::Error;

/// Tool loop errors. Tool failures are not here: they go back to the model in-band.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Brain(#[from] BrainError),

    #[error("timed out after {0}ms")]
    Timeout(u64),
}
