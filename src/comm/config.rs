// Comm configuration

use crate::comm::error::CommInitError;
use crate::config::{env_string, parse_env_var};
use std::net::SocketAddr;

/// Which channel the protocol is served on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportMode {
    /// One trusted caller over stdin/stdout
    #[default]
    Stdio,
    /// Many callers over HTTP, each with a session
    Http,
}

impl std::str::FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportMode::Stdio),
            "http" => Ok(TransportMode::Http),
            other => Err(format!("unknown transport '{}', expected stdio or http", other)),
        }
    }
}

/// Comm module configuration
#[derive(Debug, Clone)]
pub struct CommConfig {
    pub transport: TransportMode,
    /// Listen address (default: 127.0.0.1)
    pub listen_addr: String,
    /// Listen port (default: 8765)
    pub listen_port: u16,
    /// Live session ceiling in HTTP mode (default: 10)
    pub max_sessions: usize,
    /// Name reported by `/health` and `initialize`
    pub service_name: String,
}

impl Default for CommConfig {
    fn default() -> Self {
        Self {
            transport: TransportMode::Stdio,
            listen_addr: "127.0.0.1".to_string(),
            listen_port: 8765,
            max_sessions: 10,
            service_name: "gemini-bridge".to_string(),
        }
    }
}

impl CommConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        config.transport = parse_env_var("MCP_TRANSPORT", config.transport);
        if let Some(host) = env_string("MCP_HOST") {
            config.listen_addr = host;
        }
        config.listen_port = parse_env_var("PORT", config.listen_port);
        config.max_sessions = parse_env_var("MAX_SESSIONS", config.max_sessions);
        config
    }

    /// Returns the socket address to bind to
    pub fn bind_addr(&self) -> Result<SocketAddr, CommInitError> {
        let raw = if self.listen_addr.contains(':') && !self.listen_addr.starts_with('[') {
            format!("[{}]:{}", self.listen_addr, self.listen_port)
        } else {
            format!("{}:{}", self.listen_addr, self.listen_port)
        };
        raw.parse()
            .map_err(|_| CommInitError::InvalidAddress(raw))
    }
}
