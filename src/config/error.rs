use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("missing API key - set OPENAI_API_KEY or api_key in the config file")]
    MissingApiKey,
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::MissingApiKey => {
                "No API key configured. Set OPENAI_API_KEY in the environment or a .env file."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}
