// Executor module - sandboxed filesystem tools offered to the model

pub mod catalog;
pub mod config;
pub mod error;
pub mod fs;
pub mod sandbox;
pub mod tool;
pub mod types;

pub use catalog::Executor;
pub use config::ExecutorConfig;
pub use error::{ExecutorError, Result};
pub use sandbox::{Sandbox, SandboxError};
pub use tool::ToolImpl;
pub use types::ToolOutput;
