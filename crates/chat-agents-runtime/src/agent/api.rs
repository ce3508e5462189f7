//! Entry points for constructing agents from configuration structs.

use std::sync::Arc;

use chat_agents_core::middleware::AgentMiddleware;

use super::builder::AgentBuilder;
use super::config::{AgentConfig, DeepAgentParams};
use super::runtime::Agent;
use crate::backends::InMemoryBackend;
use crate::middleware::{BaseSystemPromptMiddleware, FilesystemMiddleware, HumanInLoopMiddleware};
use crate::tools::SharedBackend;

/// Create an agent from a fully specified configuration.
pub fn create_agent(config: AgentConfig) -> Agent {
    Agent::from_config(config)
}

/// Create a deep agent: base prompt, filesystem tools and optional review
/// gates, followed by any caller-supplied middleware.
///
/// Middleware order: base prompt → filesystem → human-in-loop → custom.
pub fn create_deep_agent(params: DeepAgentParams) -> anyhow::Result<Agent> {
    let DeepAgentParams {
        model,
        backend,
        checkpointer,
        interrupt_on,
        instructions,
        middleware,
        tools,
    } = params;

    let backend: SharedBackend = backend.unwrap_or_else(|| Arc::new(InMemoryBackend::new()));

    let mut stack: Vec<Arc<dyn AgentMiddleware>> = vec![
        Arc::new(BaseSystemPromptMiddleware),
        Arc::new(FilesystemMiddleware::new(backend)),
    ];
    if !interrupt_on.is_empty() {
        stack.push(Arc::new(HumanInLoopMiddleware::new(interrupt_on.clone())));
    }
    stack.extend(middleware);

    let mut builder = AgentBuilder::new()
        .with_name("deep-agent")
        .with_model(model)
        .with_system_prompt(instructions)
        .with_tools(tools);
    for layer in stack {
        builder = builder.with_middleware(layer);
    }
    for (tool, policy) in interrupt_on {
        builder = builder.with_interrupt_on(tool, policy);
    }
    if let Some(checkpointer) = checkpointer {
        builder = builder.with_checkpointer(checkpointer);
    }

    builder.build()
}
