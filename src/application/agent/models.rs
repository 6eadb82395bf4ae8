use crate::config::{AppConfig, DEFAULT_MAX_TOOL_ROUNDS, DEFAULT_MODEL};
use crate::types::{ToolCallRequest, ToolResult};
use serde::Serialize;
use serde_json::{Map, Value};

const QUIT_TOKENS: [&str; 2] = ["quit", "exit"];

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub model: String,
    pub max_tool_rounds: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tool_rounds: config.max_tool_rounds,
        }
    }
}

/// One executed tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolStep {
    pub call_id: String,
    pub tool: String,
    pub arguments: Map<String, Value>,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub response: Option<String>,
    pub steps: Vec<ToolStep>,
}

/// Progress reported while a turn runs.
#[derive(Debug, Clone, Copy)]
pub enum SessionEvent<'a> {
    ToolStarted(&'a ToolCallRequest),
    ToolFinished(&'a ToolResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingUserInput,
    ModelCallInFlight,
    ToolExecutionPending,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction<'a> {
    Skip,
    Quit,
    Submit(&'a str),
}

pub fn classify_input(line: &str) -> InputAction<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        InputAction::Skip
    } else if QUIT_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
    {
        InputAction::Quit
    } else {
        InputAction::Submit(trimmed)
    }
}
