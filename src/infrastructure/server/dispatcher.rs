use super::filesystem::{self, FsFault};
use super::tools::{self, FsTool};
use crate::types::ToolDefinition;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{error, info, warn};

/// Runs filesystem tools by name and always answers with text.
#[derive(Debug, Clone, Default)]
pub struct ToolDispatcher;

impl ToolDispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        tools::catalog()
    }

    /// Executes `tool_name` with `arguments`.
    ///
    /// Faults are rendered into the returned string; this never fails.
    pub async fn execute(&self, tool_name: &str, arguments: &Map<String, Value>) -> String {
        let Some(tool) = FsTool::from_name(tool_name) else {
            warn!(tool = tool_name, "Unknown tool requested");
            return format!("Error: Unknown tool - '{tool_name}'");
        };

        let path = match path_argument(tool, arguments) {
            Ok(path) => path,
            Err(fault) => {
                let message = fault.render(tool.name(), "");
                error!(tool = tool.name(), ">>> {message}");
                return message;
            }
        };

        info!(tool = tool.name(), path = %path, ">>> Tool called");
        match run(tool, Path::new(&path), arguments).await {
            Ok(output) => {
                info!(tool = tool.name(), path = %path, ">>> Tool completed");
                output
            }
            Err(fault) => {
                let message = fault.render(tool.name(), &path);
                error!(tool = tool.name(), path = %path, ">>> {message}");
                message
            }
        }
    }
}

async fn run(tool: FsTool, path: &Path, arguments: &Map<String, Value>) -> Result<String, FsFault> {
    match tool {
        FsTool::ReadFile => filesystem::read_file(path).await,
        FsTool::WriteFile => {
            let content = string_argument(arguments, "content")?;
            filesystem::write_file(path, content).await
        }
        FsTool::ListDirectory => filesystem::list_directory(path).await,
        FsTool::DeleteFile => filesystem::delete_file(path).await,
        FsTool::CreateDirectory => filesystem::create_directory(path).await,
        FsTool::FileInfo => filesystem::file_info(path).await,
    }
}

fn path_argument(tool: FsTool, arguments: &Map<String, Value>) -> Result<String, FsFault> {
    let key = tool.path_argument();
    match (arguments.get(key), tool.default_path()) {
        (None | Some(Value::Null), Some(default)) => Ok(default.to_string()),
        (Some(Value::String(path)), Some(default)) if path.trim().is_empty() => {
            Ok(default.to_string())
        }
        _ => string_argument(arguments, key).map(str::to_string),
    }
}

fn string_argument<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<&'a str, FsFault> {
    match arguments.get(key) {
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(FsFault::Unclassified(format!(
            "argument '{key}' must be a string"
        ))),
        None => Err(FsFault::Unclassified(format!(
            "missing required argument '{key}'"
        ))),
    }
}
