//! Interactive chat client for the lean-mcp filesystem tools.

use clap::Parser;
use lean_mcp::ChatCli;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    let cli = ChatCli::parse();
    lean_mcp::run_chat(cli).await
}
