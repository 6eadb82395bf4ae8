//! Filesystem MCP tool server.
//!
//! Serves over stdio when stdin is piped, otherwise over HTTP.

use clap::Parser;
use lean_mcp::ServerCli;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    let cli = ServerCli::parse();
    lean_mcp::run_server(cli).await
}
