use std::collections::BTreeMap;

use async_trait::async_trait;
use chat_agents_core::hitl::InterruptOnConfig;
use chat_agents_core::llm::ModelRequest;
use chat_agents_core::messaging::CacheControl;
use chat_agents_core::middleware::{AgentMiddleware, StatePatch};
use chat_agents_core::runtime::{RunContext, StateValues};
use chat_agents_core::tools::ToolBox;

use crate::prompts::{BASE_AGENT_PROMPT, FILESYSTEM_SYSTEM_PROMPT, HITL_PROMPT_HEADER};
use crate::tools::{create_filesystem_tools, SharedBackend};

pub const DEFAULT_CACHE_TTL: &str = "5m";

/// Marks the last outgoing message with an ephemeral `cache_control` entry so
/// providers that support prompt caching can reuse the conversation prefix.
#[derive(Debug, Clone)]
pub struct PromptCachingMiddleware {
    ttl: String,
}

impl PromptCachingMiddleware {
    pub fn new(ttl: impl Into<String>) -> Self {
        Self { ttl: ttl.into() }
    }

    pub fn ttl(&self) -> &str {
        &self.ttl
    }
}

impl Default for PromptCachingMiddleware {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[async_trait]
impl AgentMiddleware for PromptCachingMiddleware {
    fn id(&self) -> &'static str {
        "prompt-caching"
    }

    async fn modify_model_request(&self, request: &mut ModelRequest) -> anyhow::Result<()> {
        if let Some(last) = request.messages.last_mut() {
            last.cache_control = Some(CacheControl::ephemeral(self.ttl.clone()));
        }
        Ok(())
    }
}

/// Logs the caller's `user_id` and the latest message before every model call.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

#[async_trait]
impl AgentMiddleware for LoggingMiddleware {
    fn id(&self) -> &'static str {
        "logging"
    }

    async fn before_model(
        &self,
        state: &StateValues,
        context: &RunContext,
    ) -> anyhow::Result<Option<StatePatch>> {
        let user_id = context.user_id.as_deref().unwrap_or("anonymous");
        match state.messages.last() {
            Some(last) => tracing::info!(
                user_id,
                role = last.role.as_str(),
                content = %last.content.to_display_string(),
                "before model call"
            ),
            None => tracing::info!(user_id, "before model call with empty thread"),
        }
        Ok(None)
    }
}

pub struct BaseSystemPromptMiddleware;

#[async_trait]
impl AgentMiddleware for BaseSystemPromptMiddleware {
    fn id(&self) -> &'static str {
        "base-prompt"
    }

    async fn modify_model_request(&self, request: &mut ModelRequest) -> anyhow::Result<()> {
        request.append_prompt(BASE_AGENT_PROMPT);
        Ok(())
    }
}

/// Registers the filesystem tools over `backend` and explains them to the model.
pub struct FilesystemMiddleware {
    backend: SharedBackend,
}

impl FilesystemMiddleware {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl AgentMiddleware for FilesystemMiddleware {
    fn id(&self) -> &'static str {
        "filesystem"
    }

    fn tools(&self) -> Vec<ToolBox> {
        create_filesystem_tools(self.backend.clone())
    }

    async fn modify_model_request(&self, request: &mut ModelRequest) -> anyhow::Result<()> {
        request.append_prompt(FILESYSTEM_SYSTEM_PROMPT);
        Ok(())
    }
}

/// Tells the model which tools are gated behind human review.
pub struct HumanInLoopMiddleware {
    policies: BTreeMap<String, InterruptOnConfig>,
}

impl HumanInLoopMiddleware {
    pub fn new(policies: BTreeMap<String, InterruptOnConfig>) -> Self {
        Self { policies }
    }

    fn prompt_fragment(&self) -> Option<String> {
        if self.policies.is_empty() {
            return None;
        }
        let lines: Vec<String> = self
            .policies
            .iter()
            .map(|(tool, policy)| match &policy.description {
                Some(note) => format!("- {tool}: {note}"),
                None => format!("- {tool}: Requires approval"),
            })
            .collect();
        Some(format!("{HITL_PROMPT_HEADER}\n{}", lines.join("\n")))
    }
}

#[async_trait]
impl AgentMiddleware for HumanInLoopMiddleware {
    fn id(&self) -> &'static str {
        "human-in-loop"
    }

    async fn modify_model_request(&self, request: &mut ModelRequest) -> anyhow::Result<()> {
        if let Some(fragment) = self.prompt_fragment() {
            request.append_prompt(&fragment);
        }
        Ok(())
    }
}

/// Before-model hook built from a plain closure.
pub struct FnBeforeModel<F> {
    id: &'static str,
    hook: F,
}

/// Wraps `hook` as a middleware that runs before every model call.
///
/// ```ignore
/// let log = before_model_fn("log_before_model", |state, context| {
///     tracing::info!(user_id = ?context.user_id, messages = state.messages.len());
///     None
/// });
/// ```
pub fn before_model_fn<F>(id: &'static str, hook: F) -> FnBeforeModel<F>
where
    F: Fn(&StateValues, &RunContext) -> Option<StatePatch> + Send + Sync,
{
    FnBeforeModel { id, hook }
}

#[async_trait]
impl<F> AgentMiddleware for FnBeforeModel<F>
where
    F: Fn(&StateValues, &RunContext) -> Option<StatePatch> + Send + Sync,
{
    fn id(&self) -> &'static str {
        self.id
    }

    async fn before_model(
        &self,
        state: &StateValues,
        context: &RunContext,
    ) -> anyhow::Result<Option<StatePatch>> {
        Ok((self.hook)(state, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryBackend;
    use chat_agents_core::messaging::Message;
    use std::sync::Arc;

    #[tokio::test]
    async fn prompt_caching_marks_last_message_only() {
        let mut request = ModelRequest::new(
            "System",
            vec![Message::human("one"), Message::human("two")],
        );
        PromptCachingMiddleware::default()
            .modify_model_request(&mut request)
            .await
            .unwrap();
        assert!(request.messages[0].cache_control.is_none());
        assert_eq!(
            request.messages[1].cache_control,
            Some(CacheControl::ephemeral("5m"))
        );
    }

    #[tokio::test]
    async fn prompt_caching_ignores_empty_requests() {
        let mut request = ModelRequest::new("System", vec![]);
        PromptCachingMiddleware::new("1h")
            .modify_model_request(&mut request)
            .await
            .unwrap();
        assert!(request.messages.is_empty());
    }

    #[tokio::test]
    async fn logging_middleware_never_patches_state() {
        let state = StateValues {
            messages: vec![Message::human("hi")],
        };
        let patch = LoggingMiddleware
            .before_model(&state, &RunContext::for_user("123"))
            .await
            .unwrap();
        assert!(patch.is_none());
    }

    #[tokio::test]
    async fn filesystem_middleware_registers_tools_and_prompt() {
        let middleware = FilesystemMiddleware::new(Arc::new(InMemoryBackend::new()));
        let names: Vec<_> = middleware.tools().iter().map(|t| t.schema().name).collect();
        for expected in ["ls", "read_file", "write_file", "edit_file", "glob"] {
            assert!(names.contains(&expected.to_string()));
        }

        let mut request = ModelRequest::new("System", vec![]);
        middleware.modify_model_request(&mut request).await.unwrap();
        assert!(request.system_prompt.contains("edit_file"));
    }

    #[tokio::test]
    async fn human_in_loop_lists_gated_tools() {
        let middleware = HumanInLoopMiddleware::new(BTreeMap::from([
            (
                "write_file".to_string(),
                InterruptOnConfig::default().with_description("Writes need review"),
            ),
            ("edit_file".to_string(), InterruptOnConfig::default()),
        ]));
        let mut request = ModelRequest::new("System", vec![]);
        middleware.modify_model_request(&mut request).await.unwrap();
        assert!(request.system_prompt.contains("- write_file: Writes need review"));
        assert!(request.system_prompt.contains("- edit_file: Requires approval"));
    }

    #[tokio::test]
    async fn closure_hooks_receive_context() {
        let hook = before_model_fn("greeter", |state: &StateValues, context: &RunContext| {
            let user = context.user_id.clone()?;
            Some(StatePatch::append(vec![Message::system(format!(
                "{user} has {} messages",
                state.messages.len()
            ))]))
        });
        assert_eq!(hook.id(), "greeter");

        let state = StateValues {
            messages: vec![Message::human("hi")],
        };
        let patch = hook
            .before_model(&state, &RunContext::for_user("ada"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patch.messages[0].text(), Some("ada has 1 messages"));

        let none = hook
            .before_model(&state, &RunContext::default())
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
