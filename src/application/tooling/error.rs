use thiserror::Error;

/// Failures talking to the tool server. None of these are recovered.
#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("failed to spawn MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP request to MCP server '{server}' failed: {source}")]
    Http {
        server: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("MCP server '{server}' transport error: {message}")]
    Transport { server: String, message: String },
    #[error("MCP server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("MCP server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("MCP server '{server}' returned a malformed tool catalogue: {reason}")]
    MalformedCatalog { server: String, reason: String },
    #[error("MCP server '{server}' returned no text for tool '{tool}'")]
    EmptyResult { server: String, tool: String },
    #[error("MCP server '{server}' terminated unexpectedly")]
    Terminated { server: String },
    #[error("MCP server '{server}' request cancelled")]
    Cancelled { server: String },
}

impl ToolInvokeError {
    pub fn user_message(&self) -> String {
        match self {
            ToolInvokeError::Spawn { server, .. } => {
                format!("Could not start the tool server '{server}'. Check the configured command.")
            }
            ToolInvokeError::Http { server, source } if source.is_connect() => {
                format!("Could not connect to the tool server at '{server}'. Is it running?")
            }
            ToolInvokeError::Terminated { server } | ToolInvokeError::Cancelled { server } => {
                format!("The tool server '{server}' stopped responding.")
            }
            other => other.to_string(),
        }
    }
}
