pub mod types;

pub use types::{RpcError, RpcRequest, RpcResponse};

/// MCP protocol revision spoken by both the client and the server.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Header carrying the session id on the streamable HTTP transport.
pub const SESSION_HEADER: &str = "mcp-session-id";
