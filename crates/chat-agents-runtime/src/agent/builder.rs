//! Fluent builder for [`Agent`].

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use chat_agents_core::hitl::InterruptOnConfig;
use chat_agents_core::llm::LanguageModel;
use chat_agents_core::middleware::AgentMiddleware;
use chat_agents_core::persistence::Checkpointer;
use chat_agents_core::tools::ToolBox;

use super::config::{default_max_iterations, AgentConfig};
use super::runtime::Agent;

/// Builder API to assemble an [`Agent`] in a single fluent flow.
///
/// ```ignore
/// let agent = AgentBuilder::new()
///     .with_model(model)
///     .with_system_prompt("You are a helpful assistant.")
///     .with_middleware(Arc::new(PromptCachingMiddleware::default()))
///     .with_interrupt_on("write_file", InterruptOnConfig::default())
///     .build()?;
/// ```
pub struct AgentBuilder {
    name: String,
    system_prompt: String,
    model: Option<Arc<dyn LanguageModel>>,
    tools: Vec<ToolBox>,
    middleware: Vec<Arc<dyn AgentMiddleware>>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    interrupt_on: BTreeMap<String, InterruptOnConfig>,
    max_iterations: NonZeroUsize,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            name: "agent".to_string(),
            system_prompt: String::new(),
            model: None,
            tools: Vec::new(),
            middleware: Vec::new(),
            checkpointer: None,
            interrupt_on: BTreeMap::new(),
            max_iterations: default_max_iterations(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_tool(mut self, tool: ToolBox) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools<I>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = ToolBox>,
    {
        self.tools.extend(tools);
        self
    }

    /// Appends a middleware; middlewares run in the order they are added.
    pub fn with_middleware(mut self, middleware: Arc<dyn AgentMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Requires human review before `tool_name` executes.
    pub fn with_interrupt_on(
        mut self,
        tool_name: impl Into<String>,
        config: InterruptOnConfig,
    ) -> Self {
        self.interrupt_on.insert(tool_name.into(), config);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: NonZeroUsize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn build(self) -> anyhow::Result<Agent> {
        let model = self
            .model
            .ok_or_else(|| anyhow::anyhow!("a language model is required to build an agent"))?;
        Ok(Agent::from_config(AgentConfig {
            name: self.name,
            system_prompt: self.system_prompt,
            model,
            tools: self.tools,
            middleware: self.middleware,
            checkpointer: self.checkpointer,
            interrupt_on: self.interrupt_on,
            max_iterations: self.max_iterations,
        }))
    }
}
