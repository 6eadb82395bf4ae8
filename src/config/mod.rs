mod error;

pub use error::ConfigError;

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/lean-mcp.toml";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/mcp";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 16;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful filesystem assistant. \
You have access to file operations through MCP tools. \
Help the user manage their files and directories.";

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODEL: &str = "OPENAI_MODEL";
pub const ENV_SERVER_URL: &str = "MCP_SERVER_URL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_MAX_TOOL_ROUNDS: &str = "MAX_TOOL_ROUNDS";

/// Resolved settings shared by the chat client and the tool server.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub server_url: String,
    pub server: Option<ServerCommand>,
    pub port: u16,
    pub max_tool_rounds: usize,
}

/// A tool server launched as a child process and spoken to over stdio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub command: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    system_prompt: Option<String>,
    server_url: Option<String>,
    port: Option<u16>,
    max_tool_rounds: Option<usize>,
    server: Option<RawServer>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawServer {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    workdir: Option<String>,
}

impl From<RawServer> for ServerCommand {
    fn from(raw: RawServer) -> Self {
        Self {
            command: PathBuf::from(raw.command),
            args: raw.args,
            env: raw.env,
            workdir: raw.workdir.map(PathBuf::from),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            server: None,
            port: DEFAULT_PORT,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

impl AppConfig {
    /// Loads the optional config file and applies process environment overrides.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let raw = match path {
            Some(path) => Some(read_raw(path)?),
            None => match read_raw(Path::new(DEFAULT_CONFIG_PATH)) {
                Ok(raw) => Some(raw),
                Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                    info!("Configuration file not found; using defaults and environment");
                    None
                }
                Err(other) => return Err(other),
            },
        };
        Self::from_sources(raw, |key| std::env::var(key).ok())
    }

    /// Parses TOML text and applies overrides from `env`.
    pub fn from_toml_str(
        content: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::from_sources(Some(raw), env)
    }

    /// Builds the configuration from environment lookups only.
    pub fn from_env(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::from_sources(None, env)
    }

    fn from_sources(
        raw: Option<RawConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = raw {
            config.apply_file(raw);
        }
        config.apply_env(env)?;
        Ok(config)
    }

    fn apply_file(&mut self, raw: RawConfig) {
        if let Some(value) = raw.api_key {
            self.api_key = Some(value);
        }
        if let Some(value) = raw.base_url {
            self.base_url = value;
        }
        if let Some(value) = raw.model {
            self.model = value;
        }
        if let Some(value) = raw.system_prompt {
            self.system_prompt = value;
        }
        if let Some(value) = raw.server_url {
            self.server_url = value;
        }
        if let Some(value) = raw.port {
            self.port = value;
        }
        if let Some(value) = raw.max_tool_rounds {
            self.max_tool_rounds = value;
        }
        self.server = raw.server.map(ServerCommand::from);
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = lookup(ENV_API_KEY) {
            self.api_key = Some(value);
        }
        if let Some(value) = lookup(ENV_BASE_URL) {
            self.base_url = value;
        }
        if let Some(value) = lookup(ENV_MODEL) {
            self.model = value;
        }
        if let Some(value) = lookup(ENV_SERVER_URL) {
            debug!(url = %value, "Tool server URL taken from environment");
            self.server_url = value;
        }
        if let Some(value) = lookup(ENV_PORT) {
            self.port = value
                .trim()
                .parse()
                .map_err(|err: std::num::ParseIntError| ConfigError::InvalidValue {
                    key: ENV_PORT,
                    value: value.clone(),
                    reason: err.to_string(),
                })?;
        }
        if let Some(value) = lookup(ENV_MAX_TOOL_ROUNDS) {
            self.max_tool_rounds = value.trim().parse().map_err(
                |err: std::num::ParseIntError| ConfigError::InvalidValue {
                    key: ENV_MAX_TOOL_ROUNDS,
                    value: value.clone(),
                    reason: err.to_string(),
                },
            )?;
        }
        Ok(())
    }

    /// The API key, or an error if none was configured.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

fn read_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    debug!(path = %path.display(), "Reading configuration file");
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
