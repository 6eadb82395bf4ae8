use crate::application::conversation::ConversationError;
use crate::application::tooling::ToolInvokeError;
use crate::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Tool(#[from] ToolInvokeError),
    #[error("conversation invariant violated: {0}")]
    Conversation(#[from] ConversationError),
    #[error("model kept requesting tools after {limit} rounds")]
    StepLimit { limit: usize },
    #[error("console I/O failed: {0}")]
    Console(#[from] std::io::Error),
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Model(err) => err.user_message(),
            AgentError::Tool(err) => err.user_message(),
            AgentError::Conversation(_) => {
                "The conversation got into an inconsistent state. Please restart the session."
                    .to_string()
            }
            AgentError::StepLimit { limit } => format!(
                "The assistant requested tools for more than {limit} rounds without answering."
            ),
            AgentError::Console(err) => format!("Console error: {err}"),
        }
    }
}
