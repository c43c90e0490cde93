//! Stdio transport — reads JSON-RPC from stdin, writes to stdout.
//!
//! Each message is handled on its own task so a long verification does not
//! block a later `notifications/cancelled` for it. Responses are written in
//! completion order.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::protocol::ProtocolHandler;
use crate::types::{McpError, McpResult};

use super::framing;

/// Stdio transport for desktop MCP clients.
pub struct StdioTransport {
    handler: Arc<ProtocolHandler>,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Run the transport loop on the process's stdin and stdout.
    pub async fn run(&self) -> McpResult<()> {
        tracing::info!("Stdio transport started");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve newline-delimited JSON-RPC until `reader` hits EOF and every
    /// in-flight request has answered.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> McpResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let mut tasks = JoinSet::new();
        let mut lines = reader.lines();
        let mut reading = true;

        loop {
            if !reading && tasks.is_empty() {
                while let Ok(response) = rx.try_recv() {
                    write_line(&mut writer, &response).await?;
                }
                break;
            }

            tokio::select! {
                line = lines.next_line(), if reading => {
                    match line.map_err(McpError::Io)? {
                        None => {
                            tracing::info!("EOF on input, finishing {} in-flight request(s)", tasks.len());
                            reading = false;
                        }
                        Some(line) if line.trim().is_empty() => {}
                        Some(line) => {
                            match framing::parse_message(&line) {
                                Ok(msg) => {
                                    let handler = Arc::clone(&self.handler);
                                    let tx = tx.clone();
                                    tasks.spawn(async move {
                                        if let Some(response) = handler.handle_message(msg).await {
                                            let _ = tx.send(response);
                                        }
                                    });
                                }
                                Err(e) => {
                                    tracing::warn!("Parse error: {e}");
                                    write_line(&mut writer, &framing::parse_error_response(&e)?).await?;
                                }
                            }
                        }
                    }
                }
                Some(response) = rx.recv() => {
                    write_line(&mut writer, &response).await?;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!("Request task failed: {e}");
                    }
                }
            }
        }

        Ok(())
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, value: &Value) -> McpResult<()> {
    let framed = framing::frame_message(value)?;
    writer
        .write_all(framed.as_bytes())
        .await
        .map_err(McpError::Io)?;
    writer.flush().await.map_err(McpError::Io)
}
