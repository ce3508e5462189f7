//! A deterministic local model so the demos run without a provider.
//!
//! It understands a handful of commands and turns them into tool calls when
//! the matching tool is offered in the request:
//!
//! - `write <path>: <content>` calls `write_file`
//! - `edit <path>: <old> => <new>` calls `edit_file`
//! - `read <path>` calls `read_file`
//! - `ls [path]` calls `ls`
//! - `glob <pattern>` calls `glob`
//!
//! Anything else is echoed. After a tool step it summarizes the results.

use async_trait::async_trait;
use chat_agents_core::llm::{LanguageModel, ModelRequest};
use chat_agents_core::messaging::{Message, MessageRole, ToolCall, ToolStatus};
use serde_json::{json, Value};

pub const LOCAL_PROVIDER: &str = "local";

#[derive(Debug, Clone)]
pub struct RuleBasedModel {
    name: String,
}

impl Default for RuleBasedModel {
    fn default() -> Self {
        Self::new("rules")
    }
}

impl RuleBasedModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn summarize(results: &[&Message]) -> Message {
        let lines: Vec<String> = results
            .iter()
            .map(|message| {
                let text = message.content.to_display_string();
                match message.status {
                    Some(ToolStatus::Error) => format!("The action did not complete: {text}"),
                    _ => format!("Done. {text}"),
                }
            })
            .collect();
        Message::assistant(lines.join("\n"))
    }

    fn respond_to(text: &str, offered: &[String]) -> Message {
        match parse_command(text) {
            Some((tool, args)) if offered.iter().any(|name| name == tool) => {
                Message::assistant_with_tool_calls("", vec![ToolCall::new(tool, args)])
            }
            Some((tool, _)) => Message::assistant(format!(
                "I would use `{tool}` for that, but it is not available here."
            )),
            None => Message::assistant(format!("You said: {text}")),
        }
    }
}

/// Parses a command into a tool name and its arguments.
fn parse_command(text: &str) -> Option<(&'static str, Value)> {
    let text = text.trim();
    let (verb, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    let rest = rest.trim();
    match verb {
        "write" => {
            let (path, content) = rest.split_once(':')?;
            Some((
                "write_file",
                json!({"file_path": path.trim(), "content": content.trim_start()}),
            ))
        }
        "edit" => {
            let (path, change) = rest.split_once(':')?;
            let (old, new) = change.split_once("=>")?;
            Some((
                "edit_file",
                json!({
                    "file_path": path.trim(),
                    "old_string": old.trim(),
                    "new_string": new.trim()
                }),
            ))
        }
        "read" if !rest.is_empty() => Some(("read_file", json!({"file_path": rest}))),
        "ls" if rest.is_empty() => Some(("ls", json!({}))),
        "ls" => Some(("ls", json!({"path": rest}))),
        "glob" if !rest.is_empty() => Some(("glob", json!({"pattern": rest}))),
        _ => None,
    }
}

#[async_trait]
impl LanguageModel for RuleBasedModel {
    async fn generate(&self, request: ModelRequest) -> anyhow::Result<Message> {
        let trailing_tools: Vec<&Message> = request
            .messages
            .iter()
            .rev()
            .take_while(|m| m.role == MessageRole::Tool)
            .collect();
        if !trailing_tools.is_empty() {
            let in_order: Vec<&Message> = trailing_tools.into_iter().rev().collect();
            return Ok(Self::summarize(&in_order));
        }

        let last_human = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Human)
            .map(|m| m.content.to_display_string())
            .ok_or_else(|| anyhow::anyhow!("{} received a request without a human message", self.name))?;

        let offered: Vec<String> = request.tools.iter().map(|t| t.name.clone()).collect();
        Ok(Self::respond_to(&last_human, &offered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_agents_core::tools::ToolSchema;

    fn request(messages: Vec<Message>, tools: &[&str]) -> ModelRequest {
        ModelRequest::new("", messages).with_tools(
            tools
                .iter()
                .map(|name| ToolSchema::no_params(*name, ""))
                .collect(),
        )
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_command("write /a.txt: hello world"),
            Some((
                "write_file",
                json!({"file_path": "/a.txt", "content": "hello world"})
            ))
        );
        assert_eq!(
            parse_command("edit /a.txt: hello => bye"),
            Some((
                "edit_file",
                json!({"file_path": "/a.txt", "old_string": "hello", "new_string": "bye"})
            ))
        );
        assert_eq!(parse_command("ls"), Some(("ls", json!({}))));
        assert_eq!(parse_command("read"), None);
        assert_eq!(parse_command("hello there"), None);
    }

    #[tokio::test]
    async fn calls_offered_tools_only() {
        let model = RuleBasedModel::default();
        let with_tool = model
            .generate(request(vec![Message::human("read /a.txt")], &["read_file"]))
            .await
            .unwrap();
        assert_eq!(with_tool.tool_calls[0].name, "read_file");

        let without = model
            .generate(request(vec![Message::human("read /a.txt")], &[]))
            .await
            .unwrap();
        assert!(without.tool_calls.is_empty());
        assert!(without.text().unwrap().contains("not available"));
    }

    #[tokio::test]
    async fn echoes_plain_text_and_summarizes_tool_results() {
        let model = RuleBasedModel::default();
        let echo = model
            .generate(request(vec![Message::human("hello")], &[]))
            .await
            .unwrap();
        assert_eq!(echo.text(), Some("You said: hello"));

        let summary = model
            .generate(request(
                vec![
                    Message::human("write /a.txt: x"),
                    Message::tool_error("call_1", "Rejected. Human feedback: no"),
                ],
                &["write_file"],
            ))
            .await
            .unwrap();
        assert_eq!(
            summary.text(),
            Some("The action did not complete: Rejected. Human feedback: no")
        );
    }

    #[tokio::test]
    async fn requires_a_human_message() {
        let model = RuleBasedModel::default();
        assert!(model.generate(request(vec![], &[])).await.is_err());
    }
}
