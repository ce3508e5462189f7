//! The agent runtime contract consumed by session controllers.
//!
//! A runtime accepts either new messages or a resume command for a thread,
//! streams per-step updates while it works, and exposes a state snapshot that
//! tells callers whether the run finished or is suspended on an interrupt.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hitl::ResumeCommand;
use crate::messaging::Message;
use crate::persistence::ThreadId;

/// Lazy, single-pass stream of step updates produced by a run.
pub type UpdateStream = BoxStream<'static, anyhow::Result<StepUpdate>>;

#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Starts (or resumes) a run for the configured thread.
    async fn stream(&self, input: RunInput, config: RunConfig) -> anyhow::Result<UpdateStream>;

    /// Reads the persisted state for the configured thread.
    async fn get_state(&self, config: &RunConfig) -> anyhow::Result<StateSnapshot>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunInput {
    Messages(Vec<Message>),
    Resume(ResumeCommand),
}

impl RunInput {
    pub fn human(text: impl Into<String>) -> Self {
        RunInput::Messages(vec![Message::human(text)])
    }
}

/// User-supplied context handed to middleware on every model call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl RunContext {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub thread_id: ThreadId,
    #[serde(default)]
    pub context: RunContext,
}

impl RunConfig {
    pub fn for_thread(thread_id: impl Into<ThreadId>) -> Self {
        Self {
            thread_id: thread_id.into(),
            context: RunContext::default(),
        }
    }

    pub fn with_context(mut self, context: RunContext) -> Self {
        self.context = context;
        self
    }
}

/// Graph step that produced an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Model,
    Tools,
    Other(String),
}

impl Step {
    pub fn as_str(&self) -> &str {
        match self {
            Step::Model => "model",
            Step::Tools => "tools",
            Step::Other(name) => name.as_str(),
        }
    }
}

/// Messages written to the thread by one step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepUpdate {
    pub step: Step,
    pub messages: Vec<Message>,
}

impl StepUpdate {
    pub fn model(messages: Vec<Message>) -> Self {
        Self {
            step: Step::Model,
            messages,
        }
    }

    pub fn tools(messages: Vec<Message>) -> Self {
        Self {
            step: Step::Tools,
            messages,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateValues {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interrupt {
    pub id: String,
    /// Untyped payload; callers validate it into their own types.
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingTask {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub interrupts: Vec<Interrupt>,
}

/// Point-in-time view of a thread: persisted values, the steps still to run
/// and the tasks (with their interrupts) blocking them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateSnapshot {
    pub values: StateValues,
    #[serde(default)]
    pub next: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<PendingTask>,
}

impl StateSnapshot {
    pub fn has_pending_steps(&self) -> bool {
        !self.next.is_empty()
    }

    /// The first task's first interrupt, if any.
    pub fn first_interrupt(&self) -> Option<&Interrupt> {
        self.tasks.first().and_then(|task| task.interrupts.first())
    }
}
