use super::error::ToolInvokeError;
use super::interface::ToolServerInterface;
use crate::schema::{FunctionCallSpec, translate_all};
use crate::types::{ToolCallRequest, ToolDefinition, ToolResult};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Discovery(#[from] ToolInvokeError),
    #[error("tool server '{server}' advertised tool '{name}' more than once")]
    DuplicateTool { server: String, name: String },
    #[error("tool server '{server}' advertised a tool with an empty name")]
    EmptyName { server: String },
}

impl CatalogError {
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::Discovery(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

/// Tools discovered from one server, plus the connection used to call them.
pub struct ToolCatalog {
    server: Arc<dyn ToolServerInterface>,
    tools: Vec<ToolDefinition>,
    specs: Vec<FunctionCallSpec>,
}

impl ToolCatalog {
    /// Lists the server's tools once. Any fault aborts discovery.
    pub async fn discover(server: Arc<dyn ToolServerInterface>) -> Result<Self, CatalogError> {
        let tools = server.list_tools().await?;

        let mut seen = HashSet::new();
        for tool in &tools {
            if tool.name.trim().is_empty() {
                return Err(CatalogError::EmptyName {
                    server: server.endpoint().to_string(),
                });
            }
            if !seen.insert(tool.name.as_str()) {
                return Err(CatalogError::DuplicateTool {
                    server: server.endpoint().to_string(),
                    name: tool.name.clone(),
                });
            }
        }

        let specs = translate_all(&tools);
        info!(server = server.endpoint(), tools = tools.len(), "Discovered tools");
        Ok(Self {
            server,
            tools,
            specs,
        })
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn specs(&self) -> &[FunctionCallSpec] {
        &self.specs
    }

    pub fn endpoint(&self) -> &str {
        self.server.endpoint()
    }

    /// Invokes one call; the text of the first content block is the result.
    pub async fn call(&self, request: &ToolCallRequest) -> Result<ToolResult, ToolInvokeError> {
        debug!(tool = %request.name, call_id = %request.id, "Invoking tool");
        let content = self
            .server
            .call_tool(&request.name, request.arguments.clone())
            .await?;
        let text = content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| ToolInvokeError::EmptyResult {
                server: self.server.endpoint().to_string(),
                tool: request.name.clone(),
            })?;
        Ok(ToolResult {
            tool_call_id: request.id.clone(),
            text,
        })
    }

    pub async fn close(&self) {
        self.server.close().await;
    }
}
