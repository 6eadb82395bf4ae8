mod console;
mod errors;
mod models;
mod runner;

#[cfg(test)]
mod tests;

pub use console::run_console;
pub use errors::AgentError;
pub use models::{
    InputAction, LoopState, SessionEvent, SessionOptions, ToolStep, TurnOutcome, classify_input,
};
pub use runner::Session;
