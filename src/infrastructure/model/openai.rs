//! OpenAI-compatible chat-completions client with function calling

use super::types::{ModelError, ModelProvider, ModelRequest, ModelResponse};
use crate::schema::FunctionCallSpec;
use crate::types::{ChatMessage, MessageRole, ToolCallRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

pub const DEFAULT_API_PATH: &str = "/v1/chat/completions";
const PROVIDER_ID: &str = "openai";

/// OpenAI-compatible client (OpenAI, Azure-style proxies, Groq, Mistral, ...)
#[derive(Clone)]
pub struct OpenAIClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenAIClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(endpoint, api_key, Client::new())
    }

    pub fn with_client(endpoint: impl Into<String>, api_key: Option<String>, client: Client) -> Self {
        Self {
            http: client,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    fn build_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = DEFAULT_API_PATH.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn require_api_key(&self) -> Result<&str, ModelError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ModelError::missing_api_key(PROVIDER_ID))
    }

    async fn post_with_bearer<Req, Res>(&self, url: &str, body: &Req) -> Result<Res, ModelError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let api_key = self.require_api_key()?;
        self.http
            .post(url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ModelError::network(PROVIDER_ID, e))?
            .error_for_status()
            .map_err(|e| ModelError::network(PROVIDER_ID, e))?
            .json()
            .await
            .map_err(|e| ModelError::network(PROVIDER_ID, e))
    }
}

#[async_trait]
impl ModelProvider for OpenAIClient {
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = self.build_url();
        let payload = OpenAIRequest::from(&request);
        info!(
            model = request.model.as_str(),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending request to chat-completion service"
        );

        let response: OpenAIResponse = self.post_with_bearer(&url, &payload).await?;
        debug!("Received response from chat-completion service");

        let message = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .ok_or_else(|| ModelError::invalid_response(PROVIDER_ID, "missing message"))?;

        Ok(ModelResponse {
            message: message.into_chat_message()?,
        })
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAITool<'a>>,
}

impl<'a> From<&'a ModelRequest> for OpenAIRequest<'a> {
    fn from(request: &'a ModelRequest) -> Self {
        Self {
            model: &request.model,
            messages: request.messages.iter().map(OpenAIMessage::from).collect(),
            tools: request
                .tools
                .iter()
                .map(|function| OpenAITool {
                    kind: "function",
                    function,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAITool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a FunctionCallSpec,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAIToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&ChatMessage> for OpenAIMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
            tool_calls: message.tool_calls.iter().map(OpenAIToolCall::from).collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

impl OpenAIMessage {
    fn into_chat_message(self) -> Result<ChatMessage, ModelError> {
        let role = MessageRole::parse(&self.role).ok_or_else(|| {
            ModelError::invalid_response(PROVIDER_ID, format!("unknown role '{}'", self.role))
        })?;
        if role != MessageRole::Assistant {
            return Err(ModelError::invalid_response(
                PROVIDER_ID,
                format!("expected an assistant message, got '{}'", self.role),
            ));
        }
        let tool_calls = self
            .tool_calls
            .into_iter()
            .map(OpenAIToolCall::into_request)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ChatMessage::assistant(self.content, tool_calls))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    /// JSON-encoded argument object.
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<&ToolCallRequest> for OpenAIToolCall {
    fn from(call: &ToolCallRequest) -> Self {
        Self {
            id: call.id.clone(),
            kind: function_kind(),
            function: OpenAIFunctionCall {
                name: call.name.clone(),
                arguments: Value::Object(call.arguments.clone()).to_string(),
            },
        }
    }
}

impl OpenAIToolCall {
    fn into_request(self) -> Result<ToolCallRequest, ModelError> {
        let raw = self.function.arguments.trim();
        let arguments = if raw.is_empty() {
            Map::new()
        } else {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                Ok(Value::Null) => Map::new(),
                Ok(other) => {
                    return Err(ModelError::invalid_response(
                        PROVIDER_ID,
                        format!(
                            "arguments of tool call '{}' must be an object, got {other}",
                            self.id
                        ),
                    ));
                }
                Err(err) => {
                    return Err(ModelError::invalid_response(
                        PROVIDER_ID,
                        format!("arguments of tool call '{}' are not JSON: {err}", self.id),
                    ));
                }
            }
        };
        Ok(ToolCallRequest::new(self.id, self.function.name, arguments))
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessage>,
}
