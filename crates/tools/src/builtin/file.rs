//! File tools: read, write, list. Every path goes through
//! `ToolContext::validate_path` before touching the filesystem.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{require_str, Tool, ToolContext, ToolOutput};

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Use this to examine source code, configuration files, or any text file in the repository."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to the file to read, relative to the working directory"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, cx: &ToolContext, input: &Value) -> ToolOutput {
        if !cx.permissions.file_read {
            return ToolOutput::error("file read not allowed");
        }
        let path = match require_str(input, "path") {
            Ok(path) => path,
            Err(out) => return out,
        };
        let abs = match cx.validate_path(path) {
            Ok(abs) => abs,
            Err(out) => return out,
        };
        match tokio::fs::read_to_string(&abs).await {
            Ok(content) => ToolOutput::text(content),
            Err(e) => ToolOutput::error(format!("failed to read file: {e}")),
        }
    }
}

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates the file if it doesn't exist, or overwrites if it does. Parent directories are created automatically."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to the file to write, relative to the working directory"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, cx: &ToolContext, input: &Value) -> ToolOutput {
        if !cx.permissions.file_write {
            return ToolOutput::error("file write not allowed");
        }
        let path = match require_str(input, "path") {
            Ok(path) => path,
            Err(out) => return out,
        };
        let Some(content) = input.get("content").and_then(|v| v.as_str()) else {
            return ToolOutput::error("content is required");
        };
        let abs = match cx.validate_path(path) {
            Ok(abs) => abs,
            Err(out) => return out,
        };
        if let Some(parent) = abs.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ToolOutput::error(format!("failed to create directory: {e}"));
            }
        }
        match tokio::fs::write(&abs, content.as_bytes()).await {
            Ok(()) => ToolOutput::text(format!(
                "Successfully wrote {} bytes to {}",
                content.len(),
                path
            )),
            Err(e) => ToolOutput::error(format!("failed to write file: {e}")),
        }
    }
}

pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and directories in a path. Returns names of entries in the directory, one per line, with a trailing / on directories."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The directory path to list, relative to the working directory. Use '.' for the current directory."
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, cx: &ToolContext, input: &Value) -> ToolOutput {
        if !cx.permissions.file_read {
            return ToolOutput::error("file read not allowed");
        }
        let path = crate::input_str(input, "path").filter(|p| !p.is_empty()).unwrap_or(".");
        let abs = match cx.validate_path(path) {
            Ok(abs) => abs,
            Err(out) => return out,
        };
        let mut dir = match tokio::fs::read_dir(&abs).await {
            Ok(dir) => dir,
            Err(e) => return ToolOutput::error(format!("failed to list directory: {e}")),
        };
        let mut names = Vec::new();
        loop {
            match dir.next_entry().await {
                Ok(Some(entry)) => {
                    let mut name = entry.file_name().to_string_lossy().into_owned();
                    if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                        name.push('/');
                    }
                    names.push(name);
                }
                Ok(None) => break,
                Err(e) => return ToolOutput::error(format!("failed to list directory: {e}")),
            }
        }
        names.sort();
        let mut out = names.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        ToolOutput::text(out)
    }
}
