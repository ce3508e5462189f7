//! Configuration structs consumed by [`create_agent`](super::create_agent)
//! and [`create_deep_agent`](super::create_deep_agent).

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use chat_agents_core::hitl::InterruptOnConfig;
use chat_agents_core::llm::LanguageModel;
use chat_agents_core::middleware::AgentMiddleware;
use chat_agents_core::persistence::Checkpointer;
use chat_agents_core::tools::ToolBox;

use crate::tools::SharedBackend;

pub const DEFAULT_MAX_ITERATIONS: usize = 25;

pub(crate) fn default_max_iterations() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_MAX_ITERATIONS).unwrap_or(NonZeroUsize::MIN)
}

/// Everything needed to assemble an [`Agent`](super::Agent).
pub struct AgentConfig {
    pub name: String,
    pub system_prompt: String,
    pub model: Arc<dyn LanguageModel>,
    pub tools: Vec<ToolBox>,
    /// Runs in registration order around every model call.
    pub middleware: Vec<Arc<dyn AgentMiddleware>>,
    /// Falls back to an in-memory checkpointer when absent.
    pub checkpointer: Option<Arc<dyn Checkpointer>>,
    /// Tool name to review policy. Calls to these tools suspend the run.
    pub interrupt_on: BTreeMap<String, InterruptOnConfig>,
    /// Upper bound on model calls per run.
    pub max_iterations: NonZeroUsize,
}

impl AgentConfig {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            name: "agent".to_string(),
            system_prompt: String::new(),
            model,
            tools: Vec::new(),
            middleware: Vec::new(),
            checkpointer: None,
            interrupt_on: BTreeMap::new(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Parameters for [`create_deep_agent`](super::create_deep_agent): an agent
/// with the base prompt, filesystem tools over `backend` and optional review
/// gates on any of its tools.
pub struct DeepAgentParams {
    pub model: Arc<dyn LanguageModel>,
    /// Storage for the filesystem tools. Defaults to an in-memory backend.
    pub backend: Option<SharedBackend>,
    pub checkpointer: Option<Arc<dyn Checkpointer>>,
    pub interrupt_on: BTreeMap<String, InterruptOnConfig>,
    pub instructions: String,
    /// Extra middleware, run after the built-in stack.
    pub middleware: Vec<Arc<dyn AgentMiddleware>>,
    pub tools: Vec<ToolBox>,
}

impl DeepAgentParams {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            backend: None,
            checkpointer: None,
            interrupt_on: BTreeMap::new(),
            instructions: String::new(),
            middleware: Vec::new(),
            tools: Vec::new(),
        }
    }
}
