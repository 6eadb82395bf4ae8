//! Streamable HTTP transport: one POST per JSON-RPC message.

use super::error::ToolInvokeError;
use super::interface::{
    ToolContent, ToolServerInterface, call_params, decode_call_result, decode_tool_list,
};
use crate::rpc::{PROTOCOL_VERSION, RpcRequest, RpcResponse, SESSION_HEADER};
use crate::types::ToolDefinition;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value, json};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

const ACCEPT_BOTH: &str = "application/json, text/event-stream";

pub struct HttpToolServer {
    http: Client,
    url: String,
    session: AsyncMutex<Option<String>>,
    id_counter: AtomicU64,
    closed: AtomicBool,
}

impl HttpToolServer {
    /// Connects and completes the `initialize` handshake.
    pub async fn connect(url: impl Into<String>) -> Result<Self, ToolInvokeError> {
        Self::connect_with_client(url, Client::new()).await
    }

    pub async fn connect_with_client(
        url: impl Into<String>,
        http: Client,
    ) -> Result<Self, ToolInvokeError> {
        let server = Self {
            http,
            url: url.into(),
            session: AsyncMutex::new(None),
            id_counter: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        };
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        let init = server.send_request("initialize", params).await?;
        let protocol = init
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(
            server = %server.url,
            protocol,
            "Connected to MCP server over HTTP"
        );
        server
            .send_notification("notifications/initialized")
            .await?;
        Ok(server)
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ToolInvokeError> {
        let id = Value::from(self.id_counter.fetch_add(1, Ordering::SeqCst));
        let request = RpcRequest::new(id.clone(), method, params);
        let response = self
            .post(&request, &id)
            .await?
            .ok_or_else(|| self.transport_error(format!("no response to '{method}'")))?;
        if let Some(error) = response.error {
            return Err(ToolInvokeError::Rpc {
                server: self.url.clone(),
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn send_notification(&self, method: &str) -> Result<(), ToolInvokeError> {
        let notification = RpcRequest::notification(method, None);
        self.post(&notification, &Value::Null).await.map(|_| ())
    }

    async fn post(
        &self,
        message: &RpcRequest,
        expected_id: &Value,
    ) -> Result<Option<RpcResponse>, ToolInvokeError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(self.transport_error("connection closed"));
        }

        let mut builder = self
            .http
            .post(&self.url)
            .header(ACCEPT, ACCEPT_BOTH)
            .json(message);
        if let Some(session) = self.session.lock().await.as_deref() {
            builder = builder.header(SESSION_HEADER, session);
        }

        let response = builder
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| self.http_error(source))?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            *self.session.lock().await = Some(session.to_string());
        }

        let status = response.status();
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/event-stream"));
        let body = response
            .text()
            .await
            .map_err(|source| self.http_error(source))?;

        if status == StatusCode::ACCEPTED || body.trim().is_empty() {
            return Ok(None);
        }

        if is_stream {
            debug!(server = %self.url, method = %message.method, "Reading event-stream response");
            return parse_event_stream(&body, expected_id)
                .map(Some)
                .ok_or_else(|| self.transport_error("event stream carried no matching response"));
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|source| ToolInvokeError::InvalidJson {
                server: self.url.clone(),
                source,
            })
    }

    fn http_error(&self, source: reqwest::Error) -> ToolInvokeError {
        ToolInvokeError::Http {
            server: self.url.clone(),
            source,
        }
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Transport {
            server: self.url.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl ToolServerInterface for HttpToolServer {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolInvokeError> {
        let result = self.send_request("tools/list", json!({})).await?;
        decode_tool_list(&self.url, result)
    }

    async fn call_tool(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<ToolContent>, ToolInvokeError> {
        let result = self
            .send_request("tools/call", call_params(tool, arguments))
            .await?;
        decode_call_result(&self.url, result)
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(session) = self.session.lock().await.take() else {
            return;
        };
        if let Err(err) = self
            .http
            .delete(&self.url)
            .header(SESSION_HEADER, session)
            .send()
            .await
        {
            debug!(server = %self.url, %err, "Failed to close MCP session");
        }
    }
}

/// Finds the response with `expected_id` among the `data:` events of an SSE body.
fn parse_event_stream(body: &str, expected_id: &Value) -> Option<RpcResponse> {
    let mut data = String::new();
    for line in body.lines().chain(std::iter::once("")) {
        if let Some(chunk) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(chunk.strip_prefix(' ').unwrap_or(chunk));
        } else if line.trim().is_empty() && !data.is_empty() {
            let event = std::mem::take(&mut data);
            match serde_json::from_str::<RpcResponse>(&event) {
                Ok(response) if response.id.as_ref() == Some(expected_id) => {
                    return Some(response);
                }
                Ok(_) => {}
                Err(err) => debug!(%err, "Skipping non-response event"),
            }
        }
    }
    None
}
