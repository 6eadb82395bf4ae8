use super::dispatcher::ToolDispatcher;
use crate::rpc::types::{JSONRPC_VERSION, RpcRequest, RpcResponse};
use crate::rpc::PROTOCOL_VERSION;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

pub const SERVER_NAME: &str = "lean-mcp";

const INSTRUCTIONS: &str = "Filesystem tools. Every tool answers with text; failures start with 'Error'.";

/// Routes MCP JSON-RPC messages to the tool dispatcher.
#[derive(Debug, Clone, Default)]
pub struct McpHandler {
    dispatcher: ToolDispatcher,
}

impl McpHandler {
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Handles one raw message. Returns `None` for notifications.
    pub async fn handle_raw(&self, raw: &str) -> Option<RpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "Received unparsable JSON-RPC message");
                return Some(RpcResponse::parse_error(format!("Parse error: {err}")));
            }
        };
        let id = value.get("id").cloned();
        match serde_json::from_value::<RpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(err) => Some(RpcResponse::invalid_request(
                id,
                format!("Invalid request: {err}"),
            )),
        }
    }

    pub async fn handle(&self, request: RpcRequest) -> Option<RpcResponse> {
        debug!(method = %request.method, "Received JSON-RPC message");

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(RpcResponse::invalid_request(
                request.id,
                "Unsupported jsonrpc version (expected 2.0)",
            ));
        }

        if request.is_notification() {
            self.handle_notification(&request);
            return None;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            "initialize" => self.initialize(id, request.params.as_ref()),
            "ping" => RpcResponse::success(id, json!({})),
            "tools/list" => self.list_tools(id),
            "tools/call" => self.call_tool(id, request.params).await,
            other => {
                warn!(method = other, "Unknown JSON-RPC method");
                RpcResponse::method_not_found(id, other)
            }
        };
        Some(response)
    }

    fn handle_notification(&self, request: &RpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => info!("Client finished initialization"),
            "notifications/cancelled" => debug!("Ignoring cancellation notification"),
            other => debug!(method = other, "Ignoring notification"),
        }
    }

    fn initialize(&self, id: Option<Value>, params: Option<&Value>) -> RpcResponse {
        let client = params
            .and_then(|params| params.get("clientInfo"))
            .and_then(|info| info.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(client, "Initializing MCP session");
        RpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "instructions": INSTRUCTIONS,
            }),
        )
    }

    fn list_tools(&self, id: Option<Value>) -> RpcResponse {
        let tools = self.dispatcher.definitions();
        debug!(count = tools.len(), "Listing tools");
        RpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn call_tool(&self, id: Option<Value>, params: Option<Value>) -> RpcResponse {
        let Some(Value::Object(mut params)) = params else {
            return RpcResponse::invalid_params(id, "params must be an object with a tool name");
        };
        let name = match params.remove("name") {
            Some(Value::String(name)) => name,
            _ => return RpcResponse::invalid_params(id, "params.name must be a string"),
        };
        let arguments = match params.remove("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(arguments)) => arguments,
            Some(_) => {
                return RpcResponse::invalid_params(id, "params.arguments must be an object");
            }
        };

        let text = self.dispatcher.execute(&name, &arguments).await;
        RpcResponse::success(
            id,
            json!({
                "content": [{ "type": "text", "text": text }],
                "isError": false,
            }),
        )
    }
}
