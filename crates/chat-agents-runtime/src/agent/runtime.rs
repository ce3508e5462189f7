//! Agent runtime: the model/tools loop, human review suspension and resume.
//!
//! Each run loads the thread from the checkpointer, appends its input and
//! alternates model and tool steps until the model answers without tool
//! calls. When the model asks for a tool listed in `interrupt_on`, the run
//! stops and persists a [`SuspendedRun`]; a later [`RunInput::Resume`] applies
//! one decision per gated call and continues the loop. State is checkpointed
//! after every step, so dropping a stream leaves the thread exactly as far as
//! it got.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use chat_agents_core::hitl::{
    ActionRequest, Decision, HitlRequest, InterruptOnConfig, ResumeCommand, ReviewConfig,
};
use chat_agents_core::llm::{LanguageModel, ModelRequest};
use chat_agents_core::messaging::{Message, MessageRole, ToolCall};
use chat_agents_core::middleware::AgentMiddleware;
use chat_agents_core::persistence::{
    Checkpointer, InMemoryCheckpointer, SuspendedRun, ThreadId, ThreadState,
};
use chat_agents_core::runtime::{
    AgentRuntime, Interrupt, PendingTask, RunConfig, RunContext, RunInput, StateSnapshot,
    StateValues, Step, StepUpdate, UpdateStream,
};
use chat_agents_core::tools::ToolBox;
use chrono::Utc;
use futures::{Stream, StreamExt};

use super::config::AgentConfig;

/// Name of the task reported while a run waits for human review.
pub const REVIEW_TASK_NAME: &str = "human_review";

/// In-process agent implementing [`AgentRuntime`]. Cheap to clone.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    name: String,
    system_prompt: String,
    model: Arc<dyn LanguageModel>,
    middlewares: Vec<Arc<dyn AgentMiddleware>>,
    tools: Vec<ToolBox>,
    interrupt_on: BTreeMap<String, InterruptOnConfig>,
    checkpointer: Arc<dyn Checkpointer>,
    max_iterations: NonZeroUsize,
}

impl Agent {
    pub fn from_config(config: AgentConfig) -> Self {
        let checkpointer = config.checkpointer.unwrap_or_else(|| {
            tracing::warn!(
                agent = %config.name,
                "no checkpointer configured, thread state is kept in memory"
            );
            Arc::new(InMemoryCheckpointer::new())
        });

        let mut tools: Vec<ToolBox> = Vec::new();
        let registered = config
            .tools
            .into_iter()
            .chain(config.middleware.iter().flat_map(|m| m.tools()));
        for tool in registered {
            let name = tool.schema().name;
            if tools.iter().any(|t| t.schema().name == name) {
                tracing::warn!(tool = %name, "duplicate tool registration ignored");
                continue;
            }
            tools.push(tool);
        }

        for gated in config.interrupt_on.keys() {
            if !tools.iter().any(|t| &t.schema().name == gated) {
                tracing::warn!(tool = %gated, "interrupt_on names a tool that is not registered");
            }
        }

        Self {
            inner: Arc::new(AgentInner {
                name: config.name,
                system_prompt: config.system_prompt,
                model: config.model,
                middlewares: config.middleware,
                tools,
                interrupt_on: config.interrupt_on,
                checkpointer,
                max_iterations: config.max_iterations,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Names of every tool available to the model, in registration order.
    pub fn tool_names(&self) -> Vec<String> {
        self.inner.tools.iter().map(|t| t.schema().name).collect()
    }

    /// Delete saved state for the specified thread.
    pub async fn delete_thread(&self, thread_id: &ThreadId) -> anyhow::Result<()> {
        self.inner.checkpointer.delete_thread(thread_id).await
    }

    /// List all threads with saved state.
    pub async fn list_threads(&self) -> anyhow::Result<Vec<ThreadId>> {
        self.inner.checkpointer.list_threads().await
    }
}

impl AgentInner {
    async fn load(&self, thread_id: &ThreadId) -> anyhow::Result<ThreadState> {
        Ok(self
            .checkpointer
            .load_state(thread_id)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, thread_id: &ThreadId, state: &mut ThreadState) -> anyhow::Result<()> {
        state.touch();
        self.checkpointer.save_state(thread_id, state).await
    }

    fn find_tool(&self, name: &str) -> Option<&ToolBox> {
        self.tools.iter().find(|t| t.schema().name == name)
    }

    async fn call_model(&self, messages: Vec<Message>) -> anyhow::Result<Message> {
        let schemas = self.tools.iter().map(|t| t.schema()).collect();
        let mut request = ModelRequest::new(self.system_prompt.clone(), messages).with_tools(schemas);
        for middleware in &self.middlewares {
            middleware.modify_model_request(&mut request).await?;
        }
        let mut reply = self.model.generate(request).await?;
        reply.role = MessageRole::Assistant;
        Ok(reply)
    }

    async fn execute(&self, call: &ToolCall) -> Message {
        let Some(tool) = self.find_tool(&call.name) else {
            tracing::warn!(tool = %call.name, "model requested an unknown tool");
            return Message::tool_error(
                call.id.clone(),
                format!("Error: tool `{}` is not available", call.name),
            );
        };
        match tool.invoke(call.args.clone()).await {
            Ok(output) => {
                tracing::debug!(tool = %call.name, call_id = %call.id, "tool call succeeded");
                Message::tool(call.id.clone(), output)
            }
            Err(err) => {
                tracing::warn!(tool = %call.name, call_id = %call.id, error = %err, "tool call failed");
                Message::tool_error(call.id.clone(), format!("Error: {err:#}"))
            }
        }
    }

    /// A suspension for `reply` if any of its tool calls needs review.
    fn suspension_for(&self, reply: &Message) -> Option<SuspendedRun> {
        let mut action_requests = Vec::new();
        let mut review_configs = Vec::new();
        for call in &reply.tool_calls {
            if let Some(policy) = self.interrupt_on.get(&call.name) {
                action_requests.push(ActionRequest::from_tool_call(call, Some(policy.describe(call))));
                if !review_configs.iter().any(|c: &ReviewConfig| c.action_name == call.name) {
                    review_configs.push(ReviewConfig {
                        action_name: call.name.clone(),
                        allowed_decisions: policy.allowed_decisions.clone(),
                    });
                }
            }
        }
        if action_requests.is_empty() {
            return None;
        }
        Some(SuspendedRun {
            interrupt_id: uuid::Uuid::new_v4().to_string(),
            request: HitlRequest {
                action_requests,
                review_configs,
            },
            tool_calls: reply.tool_calls.clone(),
            created_at: Utc::now(),
        })
    }

    /// Checks that `command` can resume `state`.
    fn validate_resume(&self, state: &ThreadState, command: &ResumeCommand) -> anyhow::Result<()> {
        let suspended = state
            .suspended
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("thread has no pending interrupt to resume"))?;
        let pending = suspended.request.action_requests.len();
        if command.decisions.len() != pending {
            anyhow::bail!(
                "Number of human decisions ({}) does not match number of hanging tool calls ({}).",
                command.decisions.len(),
                pending
            );
        }
        for (action, decision) in suspended.request.action_requests.iter().zip(&command.decisions) {
            if !suspended.request.allows(&action.name, decision.kind()) {
                anyhow::bail!(
                    "decision {:?} is not allowed for tool `{}`",
                    decision.kind(),
                    action.name
                );
            }
            if let Decision::Edit { edited_action } = decision {
                if edited_action.name != action.name {
                    anyhow::bail!(
                        "edited action must keep the reviewed tool `{}`, got `{}`",
                        action.name,
                        edited_action.name
                    );
                }
            }
        }
        Ok(())
    }

    /// Applies the reviewer's decisions to the suspended calls and returns
    /// the resulting tool messages, in the order of the original calls.
    async fn apply_decisions(
        &self,
        state: &mut ThreadState,
        suspended: SuspendedRun,
        decisions: Vec<Decision>,
    ) -> Vec<Message> {
        let mut decisions = decisions.into_iter();
        let mut results = Vec::with_capacity(suspended.tool_calls.len());

        for call in suspended.tool_calls {
            if !self.interrupt_on.contains_key(&call.name) {
                results.push(self.execute(&call).await);
                continue;
            }
            match decisions.next() {
                Some(Decision::Approve) => results.push(self.execute(&call).await),
                Some(Decision::Edit { edited_action }) => {
                    let edited = ToolCall {
                        id: call.id.clone(),
                        name: edited_action.name,
                        args: serde_json::Value::Object(edited_action.args),
                    };
                    rewrite_tool_call(&mut state.messages, &edited);
                    results.push(self.execute(&edited).await);
                }
                Some(Decision::Reject { message }) => {
                    let text = message.unwrap_or_else(|| {
                        format!(
                            "User rejected the tool call for `{}` with id {}",
                            call.name, call.id
                        )
                    });
                    tracing::info!(tool = %call.name, call_id = %call.id, "tool call rejected by reviewer");
                    results.push(Message::tool_error(call.id.clone(), text));
                }
                None => {
                    results.push(Message::tool_error(
                        call.id.clone(),
                        format!("Error: no decision was provided for `{}`", call.name),
                    ));
                }
            }
        }
        results
    }
}

/// Replaces the tool call with `edited.id` in the latest assistant message.
fn rewrite_tool_call(messages: &mut [Message], edited: &ToolCall) {
    let target = messages
        .iter_mut()
        .rev()
        .filter(|m| m.role == MessageRole::Assistant)
        .flat_map(|m| m.tool_calls.iter_mut())
        .find(|call| call.id == edited.id);
    if let Some(call) = target {
        *call = edited.clone();
    }
}

fn run_stream(
    inner: Arc<AgentInner>,
    thread_id: ThreadId,
    context: RunContext,
    input: RunInput,
    mut state: ThreadState,
) -> impl Stream<Item = anyhow::Result<StepUpdate>> + Send + 'static {
    try_stream! {
        match input {
            RunInput::Messages(messages) => {
                state.messages.extend(messages);
                inner.save(&thread_id, &mut state).await?;
            }
            RunInput::Resume(command) => {
                if let Some(suspended) = state.suspended.take() {
                    let results = inner.apply_decisions(&mut state, suspended, command.decisions).await;
                    state.messages.extend(results.iter().cloned());
                    inner.save(&thread_id, &mut state).await?;
                    yield StepUpdate::tools(results);
                }
            }
        }

        let mut finished = false;
        for iteration in 0..inner.max_iterations.get() {
            for middleware in &inner.middlewares {
                let values = StateValues { messages: state.messages.clone() };
                let Some(patch) = middleware.before_model(&values, &context).await? else {
                    continue;
                };
                if patch.is_empty() {
                    continue;
                }
                state.messages.extend(patch.messages.iter().cloned());
                inner.save(&thread_id, &mut state).await?;
                yield StepUpdate {
                    step: Step::Other(format!("{}.before_model", middleware.id())),
                    messages: patch.messages,
                };
            }

            tracing::debug!(thread_id = %thread_id, iteration, "calling model");
            let reply = inner.call_model(state.messages.clone()).await?;
            state.messages.push(reply.clone());
            let suspension = inner.suspension_for(&reply);
            let suspended = suspension.is_some();
            if let Some(run) = suspension {
                tracing::info!(
                    thread_id = %thread_id,
                    interrupt_id = %run.interrupt_id,
                    pending = run.request.action_requests.len(),
                    "run suspended for human review"
                );
                state.suspended = Some(run);
            }
            inner.save(&thread_id, &mut state).await?;
            let tool_calls = reply.tool_calls.clone();
            yield StepUpdate::model(vec![reply]);

            if tool_calls.is_empty() || suspended {
                finished = true;
                break;
            }

            let mut results = Vec::with_capacity(tool_calls.len());
            for call in &tool_calls {
                results.push(inner.execute(call).await);
            }
            state.messages.extend(results.iter().cloned());
            inner.save(&thread_id, &mut state).await?;
            yield StepUpdate::tools(results);
        }

        if !finished {
            Err::<(), _>(anyhow::anyhow!(
                "agent `{}` exceeded {} iterations without finishing",
                inner.name,
                inner.max_iterations
            ))?;
        }
    }
}

#[async_trait]
impl AgentRuntime for Agent {
    async fn stream(&self, input: RunInput, config: RunConfig) -> anyhow::Result<UpdateStream> {
        let RunConfig { thread_id, context } = config;
        let state = self.inner.load(&thread_id).await?;

        match &input {
            RunInput::Messages(_) if state.is_suspended() => {
                anyhow::bail!(
                    "thread {thread_id} is waiting for a human decision and cannot accept new messages"
                );
            }
            RunInput::Resume(command) => self.inner.validate_resume(&state, command)?,
            RunInput::Messages(_) => {}
        }

        tracing::debug!(agent = %self.inner.name, thread_id = %thread_id, "starting run");
        Ok(run_stream(self.inner.clone(), thread_id, context, input, state).boxed())
    }

    async fn get_state(&self, config: &RunConfig) -> anyhow::Result<StateSnapshot> {
        let state = self.inner.load(&config.thread_id).await?;
        let mut snapshot = StateSnapshot {
            values: StateValues {
                messages: state.messages,
            },
            next: Vec::new(),
            tasks: Vec::new(),
        };
        if let Some(suspended) = state.suspended {
            snapshot.next.push(Step::Tools.as_str().to_string());
            snapshot.tasks.push(PendingTask {
                id: format!("{REVIEW_TASK_NAME}:{}", suspended.interrupt_id),
                name: REVIEW_TASK_NAME.to_string(),
                interrupts: vec![Interrupt {
                    id: suspended.interrupt_id,
                    value: serde_json::to_value(&suspended.request)?,
                }],
            });
        }
        Ok(snapshot)
    }
}
