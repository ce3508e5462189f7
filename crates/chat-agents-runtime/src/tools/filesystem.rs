//! Filesystem tools backed by a [`Backend`].
//!
//! Every tool holds a shared handle to the same backend, so a deep agent's
//! `ls`, `read_file`, `write_file`, `edit_file` and `glob` calls all observe
//! one consistent set of files.

use std::sync::Arc;

use async_trait::async_trait;
use chat_agents_core::tools::{Tool, ToolBox, ToolSchema};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::backends::{Backend, DEFAULT_READ_LIMIT};

pub type SharedBackend = Arc<dyn Backend>;

/// List the entries of a directory.
pub struct LsTool {
    backend: SharedBackend,
}

#[derive(Deserialize)]
struct LsArgs {
    #[serde(default = "root_path")]
    path: String,
}

fn root_path() -> String {
    "/".to_string()
}

#[async_trait]
impl Tool for LsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "ls",
            "List the files and directories at a path (default: /)",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Absolute directory path"}
                }
            }),
        )
    }

    async fn invoke(&self, args: Value) -> anyhow::Result<String> {
        let args: LsArgs = serde_json::from_value(args)?;
        let entries = self.backend.ls(&args.path)?;
        let listing: Vec<String> = entries
            .into_iter()
            .map(|info| {
                if info.is_dir {
                    format!("{}/", info.path)
                } else {
                    info.path
                }
            })
            .collect();
        Ok(serde_json::to_string(&listing)?)
    }
}

/// Read a file with line numbers.
pub struct ReadFileTool {
    backend: SharedBackend,
}

#[derive(Deserialize)]
struct ReadFileArgs {
    #[serde(rename = "file_path")]
    path: String,
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

const fn default_limit() -> usize {
    DEFAULT_READ_LIMIT
}

#[async_trait]
impl Tool for ReadFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "read_file",
            "Read the contents of a file with optional line offset and limit",
            json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path to the file to read"},
                    "offset": {"type": "integer", "description": "Line number to start reading from (default: 0)"},
                    "limit": {"type": "integer", "description": "Maximum number of lines to read (default: 2000)"}
                },
                "required": ["file_path"]
            }),
        )
    }

    async fn invoke(&self, args: Value) -> anyhow::Result<String> {
        let args: ReadFileArgs = serde_json::from_value(args)?;
        Ok(self.backend.read(&args.path, args.offset, args.limit)?)
    }
}

/// Create a new file.
pub struct WriteFileTool {
    backend: SharedBackend,
}

#[derive(Deserialize)]
struct WriteFileArgs {
    #[serde(rename = "file_path")]
    path: String,
    content: String,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "write_file",
            "Write content to a new file. Fails if the file already exists.",
            json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path to the file to write"},
                    "content": {"type": "string", "description": "Content to write to the file"}
                },
                "required": ["file_path", "content"]
            }),
        )
    }

    async fn invoke(&self, args: Value) -> anyhow::Result<String> {
        let args: WriteFileArgs = serde_json::from_value(args)?;
        self.backend.write(&args.path, &args.content)?;
        Ok(format!("Updated file {}", args.path))
    }
}

/// Exact string replacement in an existing file.
pub struct EditFileTool {
    backend: SharedBackend,
}

#[derive(Deserialize)]
struct EditFileArgs {
    #[serde(rename = "file_path")]
    path: String,
    #[serde(rename = "old_string")]
    old: String,
    #[serde(rename = "new_string")]
    new: String,
    #[serde(default)]
    replace_all: bool,
}

#[async_trait]
impl Tool for EditFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "edit_file",
            "Replace an exact string in a file. The string must be unique unless replace_all is true.",
            json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path to the file to edit"},
                    "old_string": {"type": "string", "description": "Exact text to replace"},
                    "new_string": {"type": "string", "description": "Replacement text"},
                    "replace_all": {"type": "boolean", "description": "Replace every occurrence (default: false)"}
                },
                "required": ["file_path", "old_string", "new_string"]
            }),
        )
    }

    async fn invoke(&self, args: Value) -> anyhow::Result<String> {
        let args: EditFileArgs = serde_json::from_value(args)?;
        let replaced = self
            .backend
            .edit(&args.path, &args.old, &args.new, args.replace_all)?;
        Ok(format!(
            "Successfully replaced {replaced} instance(s) of the string in '{}'",
            args.path
        ))
    }
}

/// Find files by glob pattern.
pub struct GlobTool {
    backend: SharedBackend,
}

#[derive(Deserialize)]
struct GlobArgs {
    pattern: String,
}

#[async_trait]
impl Tool for GlobTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "glob",
            "Find files matching a glob pattern, e.g. \"**/*.md\" or \"/docs/*.txt\"",
            json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "Glob pattern"}
                },
                "required": ["pattern"]
            }),
        )
    }

    async fn invoke(&self, args: Value) -> anyhow::Result<String> {
        let args: GlobArgs = serde_json::from_value(args)?;
        let matches = self.backend.glob(&args.pattern)?;
        if matches.is_empty() {
            return Ok(format!("No files found matching pattern '{}'", args.pattern));
        }
        Ok(serde_json::to_string(&matches)?)
    }
}

/// The full filesystem tool set over one backend.
pub fn create_filesystem_tools(backend: SharedBackend) -> Vec<ToolBox> {
    vec![
        Arc::new(LsTool {
            backend: backend.clone(),
        }),
        Arc::new(ReadFileTool {
            backend: backend.clone(),
        }),
        Arc::new(WriteFileTool {
            backend: backend.clone(),
        }),
        Arc::new(EditFileTool {
            backend: backend.clone(),
        }),
        Arc::new(GlobTool { backend }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryBackend;

    fn tools() -> (SharedBackend, Vec<ToolBox>) {
        let backend: SharedBackend = Arc::new(InMemoryBackend::new());
        let tools = create_filesystem_tools(backend.clone());
        (backend, tools)
    }

    fn tool(tools: &[ToolBox], name: &str) -> ToolBox {
        tools
            .iter()
            .find(|t| t.schema().name == name)
            .cloned()
            .unwrap_or_else(|| panic!("missing tool {name}"))
    }

    #[test]
    fn exposes_all_filesystem_tools() {
        let (_, tools) = tools();
        let names: Vec<_> = tools.iter().map(|t| t.schema().name).collect();
        assert_eq!(names, ["ls", "read_file", "write_file", "edit_file", "glob"]);
    }

    #[tokio::test]
    async fn write_then_read_round_trip_through_tools() {
        let (backend, tools) = tools();
        let output = tool(&tools, "write_file")
            .invoke(json!({"file_path": "/notes.txt", "content": "alpha\nbeta"}))
            .await
            .unwrap();
        assert_eq!(output, "Updated file /notes.txt");
        assert!(backend.exists("/notes.txt").unwrap());

        let read = tool(&tools, "read_file")
            .invoke(json!({"file_path": "/notes.txt", "offset": 1}))
            .await
            .unwrap();
        assert_eq!(read, "     2\tbeta");
    }

    #[tokio::test]
    async fn backend_errors_surface_as_tool_errors() {
        let (backend, tools) = tools();
        backend.put("/a.txt", "x").unwrap();

        let err = tool(&tools, "write_file")
            .invoke(json!({"file_path": "/a.txt", "content": "y"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let err = tool(&tools, "read_file")
            .invoke(json!({"file_path": "/missing.txt"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn edit_ls_and_glob() {
        let (backend, tools) = tools();
        backend.put("/docs/a.md", "hello world").unwrap();
        backend.put("/b.txt", "").unwrap();

        let edited = tool(&tools, "edit_file")
            .invoke(json!({"file_path": "/docs/a.md", "old_string": "world", "new_string": "there"}))
            .await
            .unwrap();
        assert!(edited.contains("1 instance"));
        assert_eq!(backend.read_to_string("/docs/a.md").unwrap(), "hello there");

        let listing = tool(&tools, "ls").invoke(json!({})).await.unwrap();
        assert_eq!(listing, r#"["/b.txt","/docs/"]"#);

        let found = tool(&tools, "glob")
            .invoke(json!({"pattern": "**/*.md"}))
            .await
            .unwrap();
        assert_eq!(found, r#"["/docs/a.md"]"#);

        let none = tool(&tools, "glob")
            .invoke(json!({"pattern": "*.rs"}))
            .await
            .unwrap();
        assert!(none.starts_with("No files found"));
    }
}
