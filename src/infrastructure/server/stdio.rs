use super::ServerError;
use super::handler::McpHandler;
use crate::rpc::RpcResponse;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Serves newline-delimited JSON-RPC over the process's stdin/stdout.
pub async fn serve(handler: McpHandler) -> Result<(), ServerError> {
    info!("Starting lean-mcp server with STDIO transport");
    serve_lines(&handler, BufReader::new(io::stdin()), io::stdout()).await
}

/// Reads one message per line from `reader` until EOF, answering on `writer`.
pub async fn serve_lines<R, W>(handler: &McpHandler, reader: R, mut writer: W) -> Result<(), ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debug!("Received STDIO line");
        if let Some(response) = handler.handle_raw(&line).await {
            write_response(&mut writer, &response).await?;
        }
    }
    writer.flush().await?;
    info!("STDIO input closed; stopping server");
    Ok(())
}

async fn write_response<W>(writer: &mut W, response: &RpcResponse) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(response)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}
