//! Plain-text rendering of session events for the terminal chat.

use chat_agents_core::hitl::ActionRequests;
use chat_agents_core::messaging::{Message, MessageRole, ToolStatus};

use crate::events::StreamEvent;

pub const APPROVAL_HINT: &str = "/approve to run it, or type feedback to reject";

pub fn render_message(message: &Message) -> String {
    let text = message.content.to_display_string();
    match message.role {
        MessageRole::Tool => {
            let tag = match message.status {
                Some(ToolStatus::Error) => "tool:error",
                _ => "tool:ok",
            };
            format!("[{tag}] {text}")
        }
        role => {
            let mut lines = Vec::new();
            if !text.is_empty() {
                lines.push(format!("[{}] {text}", role.as_str()));
            }
            for call in &message.tool_calls {
                lines.push(format!("  -> {} {}", call.name, call.args));
            }
            lines.join("\n")
        }
    }
}

pub fn render_approval(requests: &ActionRequests) -> String {
    let mut lines = vec![format!("Approval required for {} action(s):", requests.len())];
    for request in &requests.action_requests {
        let args = serde_json::to_string(&request.args).unwrap_or_default();
        lines.push(format!("  * {} {args}", request.name));
        if let Some(description) = &request.description {
            lines.push(format!("    {description}"));
        }
    }
    lines.push(APPROVAL_HINT.to_string());
    lines.join("\n")
}

pub fn render_event(event: &StreamEvent) -> String {
    match event {
        StreamEvent::ModelMessage(message) | StreamEvent::ToolMessage(message) => {
            render_message(message)
        }
        StreamEvent::ApprovalRequested(requests) => render_approval(requests),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_agents_core::messaging::ToolCall;
    use serde_json::json;

    #[test]
    fn renders_tool_calls_and_results() {
        let call = Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("ls", json!({"path": "/"}))],
        );
        assert_eq!(render_message(&call), r#"  -> ls {"path":"/"}"#);
        assert_eq!(
            render_message(&Message::tool_error("c1", "boom")),
            "[tool:error] boom"
        );
        assert!(render_message(&Message::human("hi")).ends_with("] hi"));
    }
}
