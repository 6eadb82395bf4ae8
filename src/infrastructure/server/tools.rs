use crate::types::ToolDefinition;
use serde_json::{Value, json};

/// The filesystem tools exposed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsTool {
    ReadFile,
    WriteFile,
    ListDirectory,
    DeleteFile,
    CreateDirectory,
    FileInfo,
}

impl FsTool {
    pub const ALL: [FsTool; 6] = [
        FsTool::ReadFile,
        FsTool::WriteFile,
        FsTool::ListDirectory,
        FsTool::DeleteFile,
        FsTool::CreateDirectory,
        FsTool::FileInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FsTool::ReadFile => "read_file",
            FsTool::WriteFile => "write_file",
            FsTool::ListDirectory => "list_directory",
            FsTool::DeleteFile => "delete_file",
            FsTool::CreateDirectory => "create_directory",
            FsTool::FileInfo => "file_info",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            FsTool::ReadFile => "Read and return the contents of a file.",
            FsTool::WriteFile => {
                "Write content to a file, creating it and any missing parent directories."
            }
            FsTool::ListDirectory => {
                "List all files and directories in the specified path as JSON with name, type and size."
            }
            FsTool::DeleteFile => "Delete a file. Directories are refused.",
            FsTool::CreateDirectory => {
                "Create a new directory, including parent directories if needed."
            }
            FsTool::FileInfo => {
                "Get detailed information about a file or directory (size, timestamps, type, permissions)."
            }
        }
    }

    /// Name of the argument that carries the path this tool operates on.
    pub fn path_argument(self) -> &'static str {
        match self {
            FsTool::ListDirectory | FsTool::CreateDirectory => "directory_path",
            _ => "file_path",
        }
    }

    /// Value used when the path argument is omitted, if the tool has one.
    pub fn default_path(self) -> Option<&'static str> {
        match self {
            FsTool::ListDirectory => Some("."),
            _ => None,
        }
    }

    pub fn input_schema(self) -> Value {
        let path_key = self.path_argument();
        let mut path_schema = json!({
            "type": "string",
            "description": match self {
                FsTool::ListDirectory => "The path to the directory to list. Defaults to the current directory.",
                FsTool::CreateDirectory => "The path to the directory to create.",
                FsTool::FileInfo => "The path to the file or directory.",
                FsTool::ReadFile => "The path to the file to read.",
                FsTool::WriteFile => "The path to the file to write.",
                FsTool::DeleteFile => "The path to the file to delete.",
            }
        });
        if let Some(default) = self.default_path() {
            path_schema["default"] = json!(default);
        }

        let mut properties = serde_json::Map::new();
        properties.insert(path_key.to_string(), path_schema);
        let mut required = Vec::new();
        if self.default_path().is_none() {
            required.push(json!(path_key));
        }
        if self == FsTool::WriteFile {
            properties.insert(
                "content".to_string(),
                json!({
                    "type": "string",
                    "description": "The content to write to the file."
                }),
            );
            required.push(json!("content"));
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

pub fn catalog() -> Vec<ToolDefinition> {
    FsTool::ALL.into_iter().map(FsTool::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_and_resolvable() {
        let names: HashSet<_> = FsTool::ALL.iter().map(|tool| tool.name()).collect();
        assert_eq!(names.len(), FsTool::ALL.len());
        for tool in FsTool::ALL {
            assert_eq!(FsTool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(FsTool::from_name("format_disk"), None);
    }

    #[test]
    fn write_schema_declares_path_and_content() {
        let schema = FsTool::WriteFile.input_schema();
        assert_eq!(schema["required"], json!(["file_path", "content"]));
        assert_eq!(schema["properties"]["content"]["type"], "string");
    }

    #[test]
    fn list_schema_has_optional_path_with_default() {
        let schema = FsTool::ListDirectory.input_schema();
        assert_eq!(schema["required"], json!([]));
        assert_eq!(schema["properties"]["directory_path"]["default"], ".");
    }
}
