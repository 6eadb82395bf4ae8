//! Append-only message history of one chat session.

use crate::types::{ChatMessage, MessageRole};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("tool message without a call id")]
    MissingCallId,
    #[error("tool message for call '{0}' has no matching assistant tool call")]
    OrphanToolResult(String),
    #[error("tool call '{0}' already has a result")]
    DuplicateToolResult(String),
}

#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    open_calls: HashSet<String>,
    /// Calls answered since the last assistant message that requested tools.
    answered_calls: HashSet<String>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            open_calls: HashSet::new(),
            answered_calls: HashSet::new(),
        }
    }

    /// Appends `message`, rejecting tool results that answer no prior call.
    pub fn append(&mut self, message: ChatMessage) -> Result<(), ConversationError> {
        match message.role {
            MessageRole::Tool => {
                let id = message
                    .tool_call_id
                    .clone()
                    .ok_or(ConversationError::MissingCallId)?;
                if self.answered_calls.contains(&id) {
                    return Err(ConversationError::DuplicateToolResult(id));
                }
                if !self.open_calls.remove(&id) {
                    return Err(ConversationError::OrphanToolResult(id));
                }
                self.answered_calls.insert(id);
            }
            MessageRole::Assistant if message.has_tool_calls() => {
                self.answered_calls.clear();
                self.open_calls
                    .extend(message.tool_calls.iter().map(|call| call.id.clone()));
            }
            MessageRole::Assistant | MessageRole::System | MessageRole::User => {}
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Calls requested by the model that have no result yet.
    pub fn pending_calls(&self) -> usize {
        self.open_calls.len()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
