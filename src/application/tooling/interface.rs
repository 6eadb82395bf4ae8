use super::error::ToolInvokeError;
use crate::types::ToolDefinition;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
        }
    }
}

/// A connection to a tool server, held for the lifetime of a session.
#[async_trait]
pub trait ToolServerInterface: Send + Sync {
    /// Human-readable endpoint label used in logs and errors.
    fn endpoint(&self) -> &str;

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolInvokeError>;

    async fn call_tool(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<ToolContent>, ToolInvokeError>;

    /// Releases the connection. Further calls fail.
    async fn close(&self);
}

#[derive(Debug, Deserialize)]
struct WireToolList {
    tools: Vec<WireTool>,
}

#[derive(Debug, Deserialize)]
struct WireTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    input_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireCallResult {
    #[serde(default)]
    content: Vec<ToolContent>,
}

/// Decodes a `tools/list` result into definitions, in server order.
pub(crate) fn decode_tool_list(
    server: &str,
    result: Value,
) -> Result<Vec<ToolDefinition>, ToolInvokeError> {
    let list: WireToolList =
        serde_json::from_value(result).map_err(|err| ToolInvokeError::MalformedCatalog {
            server: server.to_string(),
            reason: err.to_string(),
        })?;
    Ok(list
        .tools
        .into_iter()
        .map(|tool| ToolDefinition {
            description: tool
                .description
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| format!("Function {}", tool.name)),
            input_schema: tool
                .input_schema
                .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
            name: tool.name,
        })
        .collect())
}

pub(crate) fn decode_call_result(
    server: &str,
    result: Value,
) -> Result<Vec<ToolContent>, ToolInvokeError> {
    let decoded: WireCallResult =
        serde_json::from_value(result).map_err(|source| ToolInvokeError::InvalidJson {
            server: server.to_string(),
            source,
        })?;
    Ok(decoded.content)
}

/// `tools/call` params.
pub(crate) fn call_params(tool: &str, arguments: Map<String, Value>) -> Value {
    json!({
        "name": tool,
        "arguments": Value::Object(arguments),
    })
}
