//! Built-in file tools.
//!
//! Contributes `file_read` always and `file_write` only when the context
//! allows writes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::fs;

use crate::context::CommandContext;
use crate::error::Result;
use crate::tool::{AgentTool, ToolFactory};

/// Factory for file read/write tools, optionally rooted at a base directory.
#[derive(Debug, Clone, Default)]
pub struct FileToolFactory {
    base_dir: Option<PathBuf>,
}

impl FileToolFactory {
    /// Create an unrestricted file tool factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict relative paths to a base directory.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(base_dir: &Option<PathBuf>, path: &str) -> PathBuf {
        let path = Path::new(path);
        match (base_dir, path.is_absolute()) {
            (Some(base), false) => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn read_tool(&self) -> AgentTool {
        let base_dir = self.base_dir.clone();
        AgentTool::new(
            "file_read",
            "Read the contents of a file. Returns the file content as text.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "The path to the file to read"}
                },
                "required": ["path"]
            }),
            move |args: Value| {
                let base_dir = base_dir.clone();
                Box::pin(async move {
                    let Some(path) = args.get("path").and_then(|v| v.as_str()) else {
                        return Ok("Error: missing required parameter 'path'".to_string());
                    };
                    let resolved = Self::resolve(&base_dir, path);
                    match fs::read_to_string(&resolved).await {
                        Ok(content) => Ok(content),
                        Err(e) => Ok(format!("Error: failed to read {}: {e}", resolved.display())),
                    }
                })
            },
        )
    }

    fn write_tool(&self) -> AgentTool {
        let base_dir = self.base_dir.clone();
        AgentTool::new(
            "file_write",
            "Write content to a file, creating it if needed and overwriting otherwise.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "The path to the file to write"},
                    "content": {"type": "string", "description": "The content to write"}
                },
                "required": ["path", "content"]
            }),
            move |args: Value| {
                let base_dir = base_dir.clone();
                Box::pin(async move {
                    let Some(path) = args.get("path").and_then(|v| v.as_str()) else {
                        return Ok("Error: missing required parameter 'path'".to_string());
                    };
                    let Some(content) = args.get("content").and_then(|v| v.as_str()) else {
                        return Ok("Error: missing required parameter 'content'".to_string());
                    };
                    let resolved = Self::resolve(&base_dir, path);
                    match fs::write(&resolved, content).await {
                        Ok(()) => Ok(format!("Wrote {} bytes to {}", content.len(), resolved.display())),
                        Err(e) => Ok(format!("Error: failed to write {}: {e}", resolved.display())),
                    }
                })
            },
        )
    }
}

#[async_trait]
impl ToolFactory for FileToolFactory {
    fn integration(&self) -> &str {
        "file"
    }

    async fn build_tools(
        &self,
        context: &CommandContext,
        _agent_name: &str,
    ) -> Result<Vec<AgentTool>> {
        let mut tools = vec![self.read_tool()];
        if !context.file_read_only {
            tools.push(self.write_tool());
        }
        Ok(tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_only_context_drops_write_tool() {
        let factory = FileToolFactory::new();
        let writable = CommandContext::new("demo", "dev");
        let read_only = CommandContext::new("demo", "dev").read_only();

        let tools = factory.build_tools(&writable, "coder").await.unwrap();
        assert!(tools.iter().any(|t| t.name == "file_write"));

        let tools = factory.build_tools(&read_only, "coder").await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "file_read");
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FileToolFactory::with_base_dir(dir.path());
        let context = CommandContext::new("demo", "dev");
        let tools = factory.build_tools(&context, "coder").await.unwrap();

        let write = tools.iter().find(|t| t.name == "file_write").unwrap();
        let read = tools.iter().find(|t| t.name == "file_read").unwrap();

        let output = write
            .execute(json!({"path": "note.txt", "content": "hello"}))
            .await
            .unwrap();
        assert!(output.contains("Wrote 5 bytes"));

        let content = read.execute(json!({"path": "note.txt"})).await.unwrap();
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn test_read_missing_file_reports_error_text() {
        let factory = FileToolFactory::new();
        let context = CommandContext::new("demo", "dev");
        let tools = factory.build_tools(&context, "coder").await.unwrap();
        let read = tools.iter().find(|t| t.name == "file_read").unwrap();

        let output = read
            .execute(json!({"path": "/nonexistent/truly/missing.txt"}))
            .await
            .unwrap();
        assert!(output.starts_with("Error:"));
    }
}
