// Single-pipe transport: newline-delimited JSON-RPC over stdin/stdout

use crate::comm::error::Result;
use crate::comm::protocol::McpHandler;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Serve the one trusted caller on this process's stdin/stdout until EOF or shutdown.
pub async fn serve_stdio(handler: Arc<McpHandler>, shutdown: CancellationToken) -> Result<()> {
    serve_lines(handler, tokio::io::stdin(), tokio::io::stdout(), shutdown).await
}

/// Read requests line by line and answer each as soon as it completes.
///
/// Requests run concurrently; replies may come back in any order. On shutdown the
/// in-flight requests are cancelled and drained before returning.
pub async fn serve_lines<R, W>(
    handler: Arc<McpHandler>,
    reader: R,
    mut writer: W,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut lines = BufReader::new(reader).lines();
    let mut in_flight = JoinSet::new();
    info!("stdio transport ready");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }

                let handler = handler.clone();
                let tx = tx.clone();
                let cancel = shutdown.child_token();
                in_flight.spawn(async move {
                    if let Some(response) = handler.handle_text(&line, Some(cancel)).await {
                        match serde_json::to_string(&response) {
                            Ok(encoded) => {
                                let _ = tx.send(encoded);
                            }
                            Err(e) => error!(error = %e, "failed to encode response"),
                        }
                    }
                });
            }
            Some(joined) = in_flight.join_next() => {
                if let Err(e) = joined {
                    error!(error = %e, "request task failed");
                }
            }
            _ = shutdown.cancelled() => {
                info!("stdio transport shutting down");
                break;
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "request task failed");
        }
    }

    drop(tx);
    match writer_task.await {
        Ok(result) => result?,
        Err(e) => error!(error = %e, "stdout writer failed"),
    }
    info!("stdio transport closed");
    Ok(())
}
