// Parser module - normalizes CLI output (single JSON object or stream-json lines)

pub mod parse;
pub mod types;

pub use parse::{parse_single, parse_stream, reconstruct_text};
pub use types::{
    CliErrorBody, EventType, StreamEvent, StructuredResponse, ToolCallPayload, ToolResultPayload,
};
