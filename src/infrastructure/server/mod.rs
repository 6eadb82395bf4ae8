//! The filesystem tool server: dispatcher, MCP handler and transports.

pub mod dispatcher;
pub mod filesystem;
pub mod handler;
pub mod http;
pub mod stdio;
pub mod tools;

pub use dispatcher::ToolDispatcher;
pub use filesystem::FsFault;
pub use handler::McpHandler;

use std::net::SocketAddr;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize response: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How the server talks to its client. One per process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http { port: u16 },
}

impl Transport {
    /// Standard streams when stdin is piped, HTTP on `port` for an interactive terminal.
    pub fn select(stdin_is_terminal: bool, port: u16) -> Self {
        if stdin_is_terminal {
            Transport::Http { port }
        } else {
            Transport::Stdio
        }
    }
}

pub async fn serve(handler: McpHandler, transport: Transport) -> Result<(), ServerError> {
    info!(?transport, "Serving filesystem tools");
    match transport {
        Transport::Stdio => stdio::serve(handler).await,
        Transport::Http { port } => http::serve(handler, port).await,
    }
}
