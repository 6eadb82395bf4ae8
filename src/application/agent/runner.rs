use super::errors::AgentError;
use super::models::{LoopState, SessionEvent, SessionOptions, ToolStep, TurnOutcome};
use crate::application::conversation::Conversation;
use crate::application::tooling::ToolCatalog;
use crate::model::{ModelProvider, ModelRequest};
use crate::types::{ChatMessage, ToolDefinition};
use tracing::{debug, info, warn};

/// A chat session: the model, the tool catalog and the message history.
pub struct Session<P: ModelProvider> {
    provider: P,
    catalog: ToolCatalog,
    conversation: Conversation,
    options: SessionOptions,
    state: LoopState,
}

impl<P: ModelProvider> Session<P> {
    pub fn new(
        provider: P,
        catalog: ToolCatalog,
        system_prompt: impl Into<String>,
        options: SessionOptions,
    ) -> Self {
        Self {
            provider,
            catalog,
            conversation: Conversation::new(system_prompt),
            options,
            state: LoopState::AwaitingUserInput,
        }
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        self.catalog.tools()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Runs one user turn to completion.
    ///
    /// The model is called until it answers without tool calls. Every
    /// requested call is executed in order and answered with one tool
    /// message before the model is called again.
    pub async fn submit(
        &mut self,
        text: &str,
        on_event: &mut dyn FnMut(SessionEvent<'_>),
    ) -> Result<TurnOutcome, AgentError> {
        self.conversation.append(ChatMessage::user(text))?;
        let mut steps = Vec::new();
        let mut rounds = 0usize;

        loop {
            self.state = LoopState::ModelCallInFlight;
            debug!(
                messages = self.conversation.len(),
                rounds, "Submitting conversation to model provider"
            );
            let request = ModelRequest {
                model: self.options.model.clone(),
                messages: self.conversation.snapshot(),
                tools: self.catalog.specs().to_vec(),
            };
            let message = self.provider.chat(request).await?.message;

            if !message.has_tool_calls() {
                let response = message.content.clone();
                self.conversation.append(message)?;
                self.state = LoopState::Done;
                info!(steps = steps.len(), "Turn completed");
                self.state = LoopState::AwaitingUserInput;
                return Ok(TurnOutcome { response, steps });
            }

            self.state = LoopState::ToolExecutionPending;
            let calls = message.tool_calls.clone();
            self.conversation.append(message)?;
            info!(calls = calls.len(), "Model requested tool execution");

            for call in &calls {
                on_event(SessionEvent::ToolStarted(call));
                let result = self.catalog.call(call).await?;
                on_event(SessionEvent::ToolFinished(&result));
                steps.push(ToolStep {
                    call_id: call.id.clone(),
                    tool: call.name.clone(),
                    arguments: call.arguments.clone(),
                    result: result.text.clone(),
                });
                self.conversation.append(ChatMessage::tool(result))?;
            }

            rounds += 1;
            if rounds > self.options.max_tool_rounds {
                warn!(
                    limit = self.options.max_tool_rounds,
                    "Model exceeded the tool round limit"
                );
                self.state = LoopState::Done;
                return Err(AgentError::StepLimit {
                    limit: self.options.max_tool_rounds,
                });
            }
        }
    }

    /// Ends the session and releases the tool server connection.
    pub async fn close(self) {
        self.catalog.close().await;
    }
}
