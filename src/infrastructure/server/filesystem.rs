//! Filesystem primitives behind the tool server.
//!
//! Every operation returns `Result<String, FsFault>`; the dispatcher turns a
//! fault into the text the model sees.

use serde::Serialize;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::fs;

/// Recognised failure classes, checked in this order when rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsFault {
    #[error("path not found")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("path is a directory")]
    IsADirectory,
    #[error("path is not a directory")]
    NotADirectory,
    #[error("{0}")]
    Unclassified(String),
}

impl FsFault {
    /// Renders the fault as the message returned to the model.
    pub fn render(&self, operation: &str, path: &str) -> String {
        match self {
            FsFault::NotFound => format!("Error: File not found - '{path}'"),
            FsFault::PermissionDenied => format!("Error: Permission denied - '{path}'"),
            FsFault::IsADirectory => {
                format!("Error: Path is a directory, not a file - '{path}'")
            }
            FsFault::NotADirectory => format!("Error: Path is not a directory - '{path}'"),
            FsFault::Unclassified(message) => format!("Error in '{operation}': {message}"),
        }
    }
}

impl From<io::Error> for FsFault {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FsFault::NotFound,
            io::ErrorKind::PermissionDenied => FsFault::PermissionDenied,
            io::ErrorKind::IsADirectory => FsFault::IsADirectory,
            io::ErrorKind::NotADirectory => FsFault::NotADirectory,
            _ => FsFault::Unclassified(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for FsFault {
    fn from(err: serde_json::Error) -> Self {
        FsFault::Unclassified(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct DirectoryEntry {
    name: String,
    #[serde(rename = "type")]
    kind: &'static str,
    size: Option<u64>,
}

#[derive(Debug, Serialize)]
struct FileInfo {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: &'static str,
    size: u64,
    created: f64,
    modified: f64,
    is_readable: bool,
    is_writable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    extension: Option<String>,
}

pub async fn read_file(path: &Path) -> Result<String, FsFault> {
    let metadata = fs::metadata(path).await?;
    if metadata.is_dir() {
        return Err(FsFault::IsADirectory);
    }
    Ok(fs::read_to_string(path).await?)
}

pub async fn write_file(path: &Path, content: &str) -> Result<String, FsFault> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await?;
    Ok(format!(
        "Successfully wrote {} characters to '{}'",
        content.chars().count(),
        path.display()
    ))
}

pub async fn list_directory(path: &Path) -> Result<String, FsFault> {
    let metadata = fs::metadata(path).await?;
    if !metadata.is_dir() {
        return Err(FsFault::NotADirectory);
    }

    let mut entries = Vec::new();
    let mut reader = fs::read_dir(path).await?;
    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        // Follows symlinks; a dangling link is reported as a file without a size.
        let entry = match fs::metadata(entry.path()).await {
            Ok(meta) if meta.is_dir() => DirectoryEntry {
                name,
                kind: "directory",
                size: None,
            },
            Ok(meta) => DirectoryEntry {
                name,
                kind: "file",
                size: meta.is_file().then(|| meta.len()),
            },
            Err(_) => DirectoryEntry {
                name,
                kind: "file",
                size: None,
            },
        };
        entries.push(entry);
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(serde_json::to_string_pretty(&entries)?)
}

pub async fn delete_file(path: &Path) -> Result<String, FsFault> {
    if let Ok(metadata) = fs::metadata(path).await {
        if metadata.is_dir() {
            return Err(FsFault::IsADirectory);
        }
    }
    fs::remove_file(path).await?;
    Ok(format!("Successfully deleted file '{}'", path.display()))
}

pub async fn create_directory(path: &Path) -> Result<String, FsFault> {
    fs::create_dir_all(path).await?;
    Ok(format!("Successfully created directory '{}'", path.display()))
}

pub async fn file_info(path: &Path) -> Result<String, FsFault> {
    let metadata = fs::metadata(path).await?;
    let is_dir = metadata.is_dir();
    let absolute = std::path::absolute(path)?;

    let modified = metadata.modified().ok();
    let created = metadata.created().ok().or(modified);

    let is_readable = if is_dir {
        fs::read_dir(path).await.is_ok()
    } else {
        fs::File::open(path).await.is_ok()
    };

    let info = FileInfo {
        name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: absolute.display().to_string(),
        kind: if is_dir { "directory" } else { "file" },
        size: metadata.len(),
        created: epoch_seconds(created),
        modified: epoch_seconds(modified),
        is_readable,
        is_writable: !metadata.permissions().readonly(),
        extension: metadata.is_file().then(|| {
            path.extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default()
        }),
    };

    Ok(serde_json::to_string_pretty(&info)?)
}

fn epoch_seconds(time: Option<SystemTime>) -> f64 {
    time.and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}
