mod openai;
mod types;

pub use openai::{DEFAULT_API_PATH, OpenAIClient};
pub use types::{ModelError, ModelProvider, ModelRequest, ModelResponse};
