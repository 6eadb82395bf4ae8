use super::error::ToolInvokeError;
use super::interface::{
    ToolContent, ToolServerInterface, call_params, decode_call_result, decode_tool_list,
};
use crate::config::ServerCommand;
use crate::rpc::{PROTOCOL_VERSION, RpcRequest};
use crate::types::ToolDefinition;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, info, warn};

type Responder = oneshot::Sender<Result<Value, ToolInvokeError>>;

/// A tool server running as a child process, spoken to over stdio.
#[derive(Clone)]
pub struct ProcessToolServer {
    inner: Arc<ProcessInner>,
}

struct ProcessInner {
    label: String,
    child: AsyncMutex<Option<Child>>,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    pending: AsyncMutex<HashMap<String, Responder>>,
    id_counter: AtomicU64,
}

impl ProcessToolServer {
    /// Starts the server process and completes the `initialize` handshake.
    pub async fn spawn(server: &ServerCommand) -> Result<Self, ToolInvokeError> {
        let label = server.command.display().to_string();
        let mut command = Command::new(&server.command);
        command
            .args(&server.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &server.workdir {
            command.current_dir(dir);
        }
        for (key, value) in &server.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| ToolInvokeError::Spawn {
            server: label.clone(),
            source,
        })?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();

        let inner = ProcessInner::new(label, child);
        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            inner.reset().await;
            return Err(inner.transport_error("failed to capture server stdio"));
        };
        *inner.writer.lock().await = Some(BufWriter::new(stdin));
        ProcessInner::start_reader(&inner, stdout);

        if let Err(err) = inner.initialize().await {
            inner.reset().await;
            return Err(err);
        }
        Ok(Self { inner })
    }
}

#[async_trait]
impl ToolServerInterface for ProcessToolServer {
    fn endpoint(&self) -> &str {
        &self.inner.label
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolInvokeError> {
        let result = self.inner.send_request("tools/list", json!({})).await?;
        decode_tool_list(&self.inner.label, result)
    }

    async fn call_tool(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<ToolContent>, ToolInvokeError> {
        let result = self
            .inner
            .send_request("tools/call", call_params(tool, arguments))
            .await?;
        decode_call_result(&self.inner.label, result)
    }

    async fn close(&self) {
        self.inner.reset().await;
    }
}

impl ProcessInner {
    fn new(label: String, child: Child) -> Arc<Self> {
        Arc::new(Self {
            label,
            child: AsyncMutex::new(Some(child)),
            writer: AsyncMutex::new(None),
            pending: AsyncMutex::new(HashMap::new()),
            id_counter: AtomicU64::new(1),
        })
    }

    /// The reader only holds a weak handle, so dropping the last
    /// `ProcessToolServer` drops the child and `kill_on_drop` stops it.
    fn start_reader(inner: &Arc<Self>, stdout: ChildStdout) {
        tokio::spawn(Self::reader_loop(Arc::downgrade(inner), stdout));
    }

    async fn initialize(&self) -> Result<(), ToolInvokeError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        let init = self.send_request("initialize", params).await?;
        let protocol = init
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(
            server = %self.label,
            protocol,
            "Connected to MCP server over stdio"
        );
        self.write_message(&RpcRequest::notification("notifications/initialized", None))
            .await
    }

    async fn reader_loop(inner: Weak<Self>, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(raw)) = lines.next_line().await {
            let Some(this) = inner.upgrade() else {
                return;
            };
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => {
                    if let Err(err) = this.process_inbound_message(value).await {
                        warn!(server = %this.label, %err, "failed to process message from MCP server");
                    }
                }
                Err(source) => {
                    warn!(server = %this.label, line = trimmed, %source, "received invalid JSON from MCP server");
                }
            }
        }
        if let Some(this) = inner.upgrade() {
            this.reset().await;
        }
    }

    async fn process_inbound_message(&self, value: Value) -> Result<(), ToolInvokeError> {
        match (value.get("id").cloned(), value.get("method").and_then(Value::as_str)) {
            (Some(id), Some(method)) => self.handle_server_request(id, method).await,
            (Some(id), None) => {
                self.handle_response(id, value).await;
                Ok(())
            }
            (None, Some(method)) => {
                debug!(server = %self.label, method, "received notification from server");
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }

    async fn handle_response(&self, id: Value, mut value: Value) {
        let Some(key) = response_key(&id) else {
            return;
        };
        let Some(sender) = self.pending.lock().await.remove(&key) else {
            debug!(server = %self.label, response_id = key, "received response for unknown request");
            return;
        };

        let outcome = match value.get("error") {
            Some(error) => Err(ToolInvokeError::Rpc {
                server: self.label.clone(),
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
            None => Ok(value
                .get_mut("result")
                .map(Value::take)
                .unwrap_or(Value::Null)),
        };
        let _ = sender.send(outcome);
    }

    async fn handle_server_request(&self, id: Value, method: &str) -> Result<(), ToolInvokeError> {
        let reply = if method == "ping" {
            json!({"jsonrpc": "2.0", "id": id, "result": {}})
        } else {
            warn!(server = %self.label, method, "server sent unsupported request");
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {
                    "code": -32601,
                    "message": format!("client does not implement method '{method}'"),
                }
            })
        };
        self.write_message(&reply).await
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ToolInvokeError> {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.to_string(), tx);

        if let Err(err) = self
            .write_message(&RpcRequest::new(id, method, params))
            .await
        {
            self.pending.lock().await.remove(&id.to_string());
            return Err(err);
        }

        rx.await.unwrap_or_else(|_| {
            Err(ToolInvokeError::Cancelled {
                server: self.label.clone(),
            })
        })
    }

    async fn write_message<T: serde::Serialize>(&self, message: &T) -> Result<(), ToolInvokeError> {
        let mut encoded =
            serde_json::to_string(message).map_err(|source| ToolInvokeError::InvalidJson {
                server: self.label.clone(),
                source,
            })?;
        encoded.push('\n');

        let mut writer = self.writer.lock().await;
        let stream = writer
            .as_mut()
            .ok_or_else(|| self.transport_error("server connection closed"))?;
        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|source| self.transport_error(source.to_string()))
    }

    async fn reset(&self) {
        self.writer.lock().await.take();

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.kill().await {
                debug!(server = %self.label, %err, "failed to kill MCP server process (may have already exited)");
            }
            let _ = child.wait().await;
        }

        self.fail_all_pending().await;
    }

    async fn fail_all_pending(&self) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(ToolInvokeError::Terminated {
                server: self.label.clone(),
            }));
        }
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Transport {
            server: self.label.clone(),
            message: message.into(),
        }
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}
