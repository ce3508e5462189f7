use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::ModelRequest;
use crate::messaging::Message;
use crate::runtime::{RunContext, StateValues};
use crate::tools::ToolBox;

/// State changes returned by a before-model hook. Messages are appended to the thread.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatePatch {
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl StatePatch {
    pub fn append(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Extension point invoked synchronously around every model call.
/// Middlewares run in registration order.
#[async_trait]
pub trait AgentMiddleware: Send + Sync {
    /// Unique identifier for logging and diagnostics.
    fn id(&self) -> &'static str;

    /// Tools to expose when this middleware is active.
    fn tools(&self) -> Vec<ToolBox> {
        Vec::new()
    }

    /// Runs before the model with the current thread state and the run context.
    async fn before_model(
        &self,
        _state: &StateValues,
        _context: &RunContext,
    ) -> anyhow::Result<Option<StatePatch>> {
        Ok(None)
    }

    /// Mutates the outgoing request; the thread state is not affected.
    async fn modify_model_request(&self, _request: &mut ModelRequest) -> anyhow::Result<()> {
        Ok(())
    }
}
