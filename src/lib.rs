pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, conversation, tooling};
pub use cli::{ChatCli, ServerCli, TransportMode};
pub use config::AppConfig;
pub use domain::{schema, types};
pub use infrastructure::{model, rpc, server};

use agent::{Session, SessionOptions, run_console};
use model::OpenAIClient;
use server::{McpHandler, ToolDispatcher, Transport};
use std::error::Error;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use tooling::{HttpToolServer, ProcessToolServer, ToolCatalog, ToolServerInterface};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Runs the interactive chat client until the user quits.
pub async fn run_chat(cli: ChatCli) -> Result<(), Box<dyn Error>> {
    init_tracing("warn");
    debug!(config = ?cli.config, model = ?cli.model, "CLI arguments parsed");

    let mut config = AppConfig::load(cli.config.as_deref().map(Path::new))?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(url) = cli.server_url {
        config.server_url = url;
    }
    if let Some(system) = cli.system {
        config.system_prompt = system;
    }
    let api_key = config.require_api_key()?.to_string();

    println!("Connecting to lean-mcp server...");
    let server: Arc<dyn ToolServerInterface> = match &config.server {
        Some(command) => Arc::new(ProcessToolServer::spawn(command).await?),
        None => Arc::new(HttpToolServer::connect(config.server_url.clone()).await?),
    };
    let catalog = match ToolCatalog::discover(Arc::clone(&server)).await {
        Ok(catalog) => catalog,
        Err(err) => {
            server.close().await;
            return Err(err.into());
        }
    };

    let provider = OpenAIClient::new(config.base_url.clone(), Some(api_key));
    let mut session = Session::new(
        provider,
        catalog,
        config.system_prompt.clone(),
        SessionOptions::from(&config),
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let outcome = run_console(&mut session, stdin, &mut stdout).await;
    session.close().await;
    outcome.map_err(|err| err.user_message().into())
}

/// Runs the filesystem tool server on the selected transport.
pub async fn run_server(cli: ServerCli) -> Result<(), Box<dyn Error>> {
    init_tracing("info");

    let config = AppConfig::load(cli.config.as_deref().map(Path::new))?;
    let port = cli.port.unwrap_or(config.port);
    let transport = match cli.transport {
        TransportMode::Auto => Transport::select(std::io::stdin().is_terminal(), port),
        TransportMode::Stdio => Transport::Stdio,
        TransportMode::Http => Transport::Http { port },
    };
    info!(?transport, "Starting lean-mcp server");

    let handler = McpHandler::new(ToolDispatcher::new());
    server::serve(handler, transport).await?;
    Ok(())
}

/// Installs the stderr subscriber; `RUST_LOG` overrides `default_level`.
pub fn init_tracing(default_level: &str) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
