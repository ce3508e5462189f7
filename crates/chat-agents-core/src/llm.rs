use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::messaging::Message;
use crate::tools::ToolSchema;

/// Request sent to the underlying language model. Middlewares can augment
/// the system prompt or mutate the pending message list before the model call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,
}

impl ModelRequest {
    pub fn new(system_prompt: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    pub fn append_prompt(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if !self.system_prompt.is_empty() {
            self.system_prompt.push_str("\n\n");
        }
        self.system_prompt.push_str(fragment);
    }
}

/// A chat model. Returns one assistant message, optionally carrying tool calls.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> anyhow::Result<Message>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_prompt_separates_fragments() {
        let mut request = ModelRequest::new("", vec![]);
        request.append_prompt("first");
        request.append_prompt("");
        request.append_prompt("second");
        assert_eq!(request.system_prompt, "first\n\nsecond");
    }
}
