// Bridge module - the execution core behind every transport

pub mod backend;
pub mod config;
pub mod error;
pub mod exec;
pub mod types;

pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeInitError, ErrorKind};
pub use exec::Bridge;
pub use types::{ExecutionRequest, ExecutionResult, OutputMode, DEFAULT_TIMEOUT_MS};
