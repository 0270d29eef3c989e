// Comm module - MCP transports: a single stdio pipe or a multi-session HTTP server

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod stdio;
pub mod types;

pub use config::{CommConfig, TransportMode};
pub use error::{CommError, CommInitError};
pub use protocol::McpHandler;
pub use server::{router, serve_http, AppState};
pub use session::{Session, SessionManager};
pub use stdio::{serve_lines, serve_stdio};
