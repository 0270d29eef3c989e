use clap::Parser;
use gemini_bridge::bridge::{Bridge, BridgeConfig};
use gemini_bridge::comm::{serve_http, serve_stdio, CommConfig, McpHandler, TransportMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt;

/// MCP server that forwards prompts to Gemini
#[derive(Debug, Parser)]
#[command(name = "gemini-bridge", version, about)]
struct Args {
    /// Transport: stdio (one local caller) or http (sessions)
    #[arg(long, env = "MCP_TRANSPORT")]
    transport: Option<TransportMode>,

    /// Listen address in http mode
    #[arg(long, env = "MCP_HOST")]
    host: Option<String>,

    /// Listen port in http mode
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Live session ceiling in http mode
    #[arg(long, env = "MAX_SESSIONS")]
    max_sessions: Option<usize>,

    /// Directory the file tools are confined to
    #[arg(long, env = "WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,

    /// File whose contents are sent as the system prompt
    #[arg(long, env = "GEMINI_SYSTEM_PROMPT_FILE")]
    system_prompt_file: Option<PathBuf>,

    /// trace, debug, info, warn or error
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // stdout carries the protocol in stdio mode, so logs go to stderr.
    let level = args.log_level.parse::<Level>().unwrap_or(Level::INFO);
    fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting gemini-bridge...");

    let mut bridge_config = BridgeConfig::from_env();
    if let Some(root) = args.workspace_root {
        bridge_config.executor.workspace_root = root;
    }

    let mut comm_config = CommConfig::from_env();
    if let Some(transport) = args.transport {
        comm_config.transport = transport;
    }
    if let Some(host) = args.host {
        comm_config.listen_addr = host;
    }
    if let Some(port) = args.port {
        comm_config.listen_port = port;
    }
    if let Some(max) = args.max_sessions {
        comm_config.max_sessions = max;
    }

    let system_prompt = match args.system_prompt_file.as_deref() {
        Some(path) => Some(load_system_prompt(path)?),
        None => None,
    };

    info!(
        transport = ?comm_config.transport,
        model = %bridge_config.brain.default_model,
        workspace_root = %bridge_config.executor.workspace_root.display(),
        max_tool_rounds = bridge_config.agent.max_tool_rounds,
        has_system_prompt = system_prompt.is_some(),
        "Configuration loaded"
    );

    let bridge = Bridge::new(bridge_config)?.with_system_prompt(system_prompt);
    info!(
        model = bridge.default_model(),
        tools = bridge.executor().tool_definitions().len(),
        "Bridge initialized"
    );
    let handler = Arc::new(McpHandler::new(
        Arc::new(bridge),
        comm_config.service_name.clone(),
    ));

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal");
        trigger.cancel();
    });

    match comm_config.transport {
        TransportMode::Stdio => {
            serve_stdio(handler, shutdown).await?;
            info!("Goodbye!");
            // The runtime's stdin read blocks until input arrives and would stall runtime drop.
            std::process::exit(0);
        }
        TransportMode::Http => serve_http(&comm_config, handler, shutdown).await?,
    }

    info!("Goodbye!");
    Ok(())
}

/// Read once at startup; requests share it by reference.
fn load_system_prompt(path: &Path) -> std::io::Result<Arc<str>> {
    let text = std::fs::read_to_string(path)?;
    info!(path = %path.display(), bytes = text.len(), "system prompt loaded");
    Ok(Arc::from(text.trim()))
}

/// Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
