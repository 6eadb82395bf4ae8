use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "lean-mcp-chat",
    version,
    about = "Chat with a model that can use the lean-mcp filesystem tools"
)]
pub struct ChatCli {
    /// Configuration file (defaults to config/lean-mcp.toml when present)
    #[arg(long)]
    pub config: Option<String>,
    /// Model name sent to the chat-completion service
    #[arg(long)]
    pub model: Option<String>,
    /// Tool server URL for the streamable HTTP transport
    #[arg(long)]
    pub server_url: Option<String>,
    /// Replaces the system prompt
    #[arg(long)]
    pub system: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "lean-mcp-server",
    version,
    about = "Filesystem tools served over the Model Context Protocol"
)]
pub struct ServerCli {
    /// Configuration file (defaults to config/lean-mcp.toml when present)
    #[arg(long)]
    pub config: Option<String>,
    /// HTTP listening port (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long, value_enum, default_value_t = TransportMode::Auto)]
    pub transport: TransportMode,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum TransportMode {
    /// Standard streams when stdin is piped, HTTP otherwise
    Auto,
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// Streamable HTTP on the configured port
    Http,
}
