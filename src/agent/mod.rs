// Agent module - bounded tool-calling loop between a backend and the tool catalog

pub mod config;
pub mod error;
pub mod inference;
pub mod types;

pub use error::InferenceError;
pub use inference::{pending_tool_calls, run_with_tools, BrainRef, ExecutorRef, LoopRequest};
pub use types::{AgentConfig, BrainReply, LoopOutcome, ToolExchange, Turn};
