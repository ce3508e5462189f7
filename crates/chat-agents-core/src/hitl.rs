//! Human-in-the-loop payloads: what a suspended run asks a reviewer, and what
//! the reviewer sends back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::messaging::ToolCall;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    Approve,
    Edit,
    Reject,
}

/// A single tool call awaiting review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRequest {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ActionRequest {
    pub fn from_tool_call(call: &ToolCall, description: Option<String>) -> Self {
        Self {
            name: call.name.clone(),
            args: call.args.as_object().cloned().unwrap_or_default(),
            description,
        }
    }
}

/// The ordered set of action requests surfaced to a UI while a run is suspended.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionRequests {
    pub action_requests: Vec<ActionRequest>,
}

impl ActionRequests {
    pub fn len(&self) -> usize {
        self.action_requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.action_requests.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewConfig {
    pub action_name: String,
    pub allowed_decisions: Vec<DecisionType>,
}

/// Interrupt value stored by the runtime when a run suspends for review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HitlRequest {
    pub action_requests: Vec<ActionRequest>,
    #[serde(default)]
    pub review_configs: Vec<ReviewConfig>,
}

impl HitlRequest {
    /// Whether `decision` may be applied to the action named `action_name`.
    /// Actions without a review config accept every decision.
    pub fn allows(&self, action_name: &str, decision: DecisionType) -> bool {
        self.review_configs
            .iter()
            .find(|cfg| cfg.action_name == action_name)
            .map(|cfg| cfg.allowed_decisions.contains(&decision))
            .unwrap_or(true)
    }

    pub fn pending(&self) -> ActionRequests {
        ActionRequests {
            action_requests: self.action_requests.clone(),
        }
    }
}

/// Replacement tool call supplied with an edit decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditedAction {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Edit { edited_action: EditedAction },
    Reject {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl Decision {
    pub fn reject(message: impl Into<String>) -> Self {
        Decision::Reject {
            message: Some(message.into()),
        }
    }

    pub fn kind(&self) -> DecisionType {
        match self {
            Decision::Approve => DecisionType::Approve,
            Decision::Edit { .. } => DecisionType::Edit,
            Decision::Reject { .. } => DecisionType::Reject,
        }
    }
}

/// Input that resumes a suspended run, one decision per pending action request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResumeCommand {
    pub decisions: Vec<Decision>,
}

impl ResumeCommand {
    pub fn new(decisions: Vec<Decision>) -> Self {
        Self { decisions }
    }

    /// Applies the same decision to `count` pending requests.
    pub fn uniform(decision: Decision, count: usize) -> Self {
        Self {
            decisions: vec![decision; count],
        }
    }
}

/// Per-tool gating policy registered at agent construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterruptOnConfig {
    pub allowed_decisions: Vec<DecisionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for InterruptOnConfig {
    fn default() -> Self {
        Self {
            allowed_decisions: vec![DecisionType::Approve, DecisionType::Edit, DecisionType::Reject],
            description: None,
        }
    }
}

impl InterruptOnConfig {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Description shown to the reviewer for `call`.
    pub fn describe(&self, call: &ToolCall) -> String {
        let prefix = self
            .description
            .as_deref()
            .unwrap_or("Tool execution requires approval");
        format!("{prefix}\n\nTool: {}\nArgs: {}", call.name, call.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decisions_use_type_tag() {
        let decisions = vec![
            Decision::Approve,
            Decision::reject("no"),
            Decision::Edit {
                edited_action: EditedAction {
                    name: "write_file".into(),
                    args: Map::new(),
                },
            },
        ];
        let value = serde_json::to_value(ResumeCommand::new(decisions)).unwrap();
        assert_eq!(value["decisions"][0], json!({"type": "approve"}));
        assert_eq!(value["decisions"][1], json!({"type": "reject", "message": "no"}));
        assert_eq!(value["decisions"][2]["type"], "edit");
    }

    #[test]
    fn review_configs_restrict_decisions() {
        let request = HitlRequest {
            action_requests: vec![],
            review_configs: vec![ReviewConfig {
                action_name: "write_file".into(),
                allowed_decisions: vec![DecisionType::Approve],
            }],
        };
        assert!(request.allows("write_file", DecisionType::Approve));
        assert!(!request.allows("write_file", DecisionType::Reject));
        assert!(request.allows("edit_file", DecisionType::Reject));
    }

    #[test]
    fn action_request_copies_object_args() {
        let call = ToolCall::new("write_file", json!({"file_path": "/a.txt", "content": "x"}));
        let request = ActionRequest::from_tool_call(&call, None);
        assert_eq!(request.name, "write_file");
        assert_eq!(request.args.get("file_path"), Some(&json!("/a.txt")));

        let odd = ToolCall::new("ls", json!("not-an-object"));
        assert!(ActionRequest::from_tool_call(&odd, None).args.is_empty());
    }

    #[test]
    fn uniform_resume_repeats_decision() {
        let cmd = ResumeCommand::uniform(Decision::Approve, 3);
        assert_eq!(cmd.decisions.len(), 3);
        assert!(cmd.decisions.iter().all(|d| d.kind() == DecisionType::Approve));
    }
}
