//! The demo agents: built-in middleware, a custom before-model hook, and a
//! deep agent whose file writes need human approval.

use std::path::PathBuf;
use std::sync::Arc;

use chat_agents_core::hitl::InterruptOnConfig;
use chat_agents_core::llm::LanguageModel;
use chat_agents_core::model::{ModelId, ModelProfile};
use chat_agents_core::persistence::{Checkpointer, InMemoryCheckpointer};
use chat_agents_core::runtime::{RunContext, StateValues};
use chat_agents_runtime::{
    before_model_fn, create_deep_agent, Agent, AgentBuilder, DeepAgentParams, FilesystemBackend,
    LoggingMiddleware, ModelRegistry, PromptCachingMiddleware,
};

use crate::rules::{RuleBasedModel, LOCAL_PROVIDER};

pub const DEFAULT_MODEL: &str = "local:rules";

/// Tools gated behind review in the deep agent demo.
pub const GATED_TOOLS: [&str; 2] = ["write_file", "edit_file"];

/// Registry with the providers available offline.
pub fn default_registry() -> ModelRegistry {
    ModelRegistry::new().register(
        LOCAL_PROVIDER,
        |id: &ModelId| -> anyhow::Result<Arc<dyn LanguageModel>> {
            Ok(Arc::new(RuleBasedModel::new(id.model())))
        },
    )
}

fn memory_checkpointer() -> Arc<dyn Checkpointer> {
    Arc::new(InMemoryCheckpointer::new())
}

/// Agent using the stock prompt caching (5 minute TTL) and logging middleware.
pub fn builtin_middleware_agent(model: Arc<dyn LanguageModel>) -> anyhow::Result<Agent> {
    AgentBuilder::new()
        .with_name("builtin-middleware")
        .with_model(model)
        .with_middleware(Arc::new(PromptCachingMiddleware::new("5m")))
        .with_middleware(Arc::new(LoggingMiddleware))
        .with_checkpointer(memory_checkpointer())
        .build()
}

/// Agent with a closure hook that logs the caller and the latest message
/// before every model call.
pub fn custom_middleware_agent(model: Arc<dyn LanguageModel>) -> anyhow::Result<Agent> {
    let log_before_model =
        before_model_fn("log_before_model", |state: &StateValues, context: &RunContext| {
            let message = state
                .messages
                .last()
                .map(|m| m.content.to_display_string())
                .unwrap_or_default();
            tracing::info!(
                user_id = context.user_id.as_deref().unwrap_or("-"),
                %message,
                "before model"
            );
            None
        });

    AgentBuilder::new()
        .with_name("custom-middleware")
        .with_model(model)
        .with_middleware(Arc::new(log_before_model))
        .with_checkpointer(memory_checkpointer())
        .build()
}

/// Deep agent over a sandboxed view of `root_dir`; `write_file` and
/// `edit_file` wait for approval.
pub fn deep_agent(model: Arc<dyn LanguageModel>, root_dir: impl Into<PathBuf>) -> anyhow::Result<Agent> {
    let mut params = DeepAgentParams::new(model);
    params.backend = Some(Arc::new(FilesystemBackend::sandboxed(root_dir)));
    params.checkpointer = Some(memory_checkpointer());
    params.interrupt_on = GATED_TOOLS
        .iter()
        .map(|tool| (tool.to_string(), InterruptOnConfig::default()))
        .collect();
    create_deep_agent(params)
}

/// Parses `<provider>:<model>` and returns its known capability profile.
pub fn model_profile(model: &str) -> anyhow::Result<ModelProfile> {
    let id: ModelId = model.parse()?;
    id.profile()
        .ok_or_else(|| anyhow::anyhow!("no profile is known for model '{id}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_builds_local_models_only() {
        let registry = default_registry();
        assert!(registry.init_chat_model(DEFAULT_MODEL).is_ok());
        assert!(registry.init_chat_model("anthropic:claude-sonnet-4-5-20250929").is_err());
    }

    #[test]
    fn deep_agent_gates_file_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let agent = deep_agent(Arc::new(RuleBasedModel::default()), dir.path()).unwrap();
        for tool in GATED_TOOLS {
            assert!(agent.tool_names().contains(&tool.to_string()));
        }
    }

    #[test]
    fn model_profiles_resolve_known_ids() {
        let profile = model_profile("openai:gpt-5.1").unwrap();
        assert!(profile.tool_calling);
        assert!(model_profile("anthropic:claude-sonnet-4-5-20250929").is_ok());
        assert!(model_profile("nobody:nothing").is_err());
        assert!(model_profile("not-an-id").is_err());
    }
}
