//! Conversation sessions over an [`AgentRuntime`] with approve/reject handling.
//!
//! Every turn (`send`, `approve`, `reject`, `decide`) submits one input to the
//! runtime and returns a lazy event stream. The stream relays model and tool
//! messages as they arrive and, once the runtime's update stream is
//! exhausted, checks the thread state: if the run stopped short of a terminal
//! step the pending action requests are emitted as a final
//! [`StreamEvent::ApprovalRequested`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_stream::try_stream;
use chat_agents_core::hitl::{ActionRequests, Decision, ResumeCommand};
use chat_agents_core::messaging::Message;
use chat_agents_core::persistence::ThreadId;
use chat_agents_core::runtime::{
    AgentRuntime, RunConfig, RunContext, RunInput, StateSnapshot, Step, UpdateStream,
};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use crate::error::SessionError;
use crate::events::StreamEvent;

/// Finite, single-pass stream of session events.
pub type EventStream = BoxStream<'static, Result<StreamEvent, SessionError>>;

pub struct SessionController {
    runtime: Arc<dyn AgentRuntime>,
    context: RunContext,
    started: Mutex<HashSet<ThreadId>>,
}

impl SessionController {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self {
            runtime,
            context: RunContext::default(),
            started: Mutex::new(HashSet::new()),
        }
    }

    /// Context handed to middleware on every run started by this controller.
    pub fn with_context(mut self, context: RunContext) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    fn config(&self, thread_id: &str) -> RunConfig {
        RunConfig::for_thread(thread_id).with_context(self.context.clone())
    }

    /// Selects `thread_id` for use. Starting an already started thread is a no-op.
    pub fn start(&self, thread_id: &str) {
        let mut started = self.started.lock().unwrap_or_else(|e| e.into_inner());
        if started.insert(thread_id.to_string()) {
            tracing::debug!(thread_id = %thread_id, "started thread");
        }
    }

    pub fn is_started(&self, thread_id: &str) -> bool {
        self.started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(thread_id)
    }

    /// Submits a human message to `thread_id`.
    pub async fn send(&self, message: &str, thread_id: &str) -> Result<EventStream, SessionError> {
        self.start(thread_id);
        if self.is_awaiting_approval(thread_id).await? {
            return Err(SessionError::InvalidThread {
                thread_id: thread_id.to_string(),
            });
        }
        tracing::info!(thread_id = %thread_id, "sending message");
        self.run(RunInput::human(message), thread_id).await
    }

    /// All persisted messages of `thread_id`; empty for unknown threads.
    pub async fn get_history(&self, thread_id: &str) -> Result<Vec<Message>, SessionError> {
        let snapshot = self.runtime.get_state(&self.config(thread_id)).await?;
        Ok(snapshot.values.messages)
    }

    pub async fn is_awaiting_approval(&self, thread_id: &str) -> Result<bool, SessionError> {
        let snapshot = self.runtime.get_state(&self.config(thread_id)).await?;
        Ok(snapshot.has_pending_steps())
    }

    /// The action requests the run is waiting on, if any.
    pub async fn pending_approval(
        &self,
        thread_id: &str,
    ) -> Result<Option<ActionRequests>, SessionError> {
        let snapshot = self.runtime.get_state(&self.config(thread_id)).await?;
        pending_requests(&snapshot)
    }

    /// Approves every pending action request and resumes the run.
    pub async fn approve(&self, thread_id: &str) -> Result<EventStream, SessionError> {
        let pending = self.require_pending(thread_id).await?;
        tracing::info!(thread_id = %thread_id, count = pending.len(), "approving pending actions");
        let command = ResumeCommand::uniform(Decision::Approve, pending.len());
        self.run(RunInput::Resume(command), thread_id).await
    }

    /// Rejects every pending action request with `feedback` and resumes the run.
    pub async fn reject(&self, feedback: &str, thread_id: &str) -> Result<EventStream, SessionError> {
        let pending = self.require_pending(thread_id).await?;
        tracing::info!(thread_id = %thread_id, count = pending.len(), "rejecting pending actions");
        let decision = Decision::reject(format!("Rejected. Human feedback: {feedback}"));
        let command = ResumeCommand::uniform(decision, pending.len());
        self.run(RunInput::Resume(command), thread_id).await
    }

    /// Resumes the run with one explicit decision per pending action request.
    pub async fn decide(
        &self,
        decisions: Vec<Decision>,
        thread_id: &str,
    ) -> Result<EventStream, SessionError> {
        let pending = self.require_pending(thread_id).await?;
        if decisions.len() != pending.len() {
            return Err(SessionError::DecisionCountMismatch {
                expected: pending.len(),
                actual: decisions.len(),
            });
        }
        self.run(RunInput::Resume(ResumeCommand::new(decisions)), thread_id)
            .await
    }

    async fn require_pending(&self, thread_id: &str) -> Result<ActionRequests, SessionError> {
        self.pending_approval(thread_id)
            .await?
            .ok_or_else(|| SessionError::NoPendingApproval {
                thread_id: thread_id.to_string(),
            })
    }

    async fn run(&self, input: RunInput, thread_id: &str) -> Result<EventStream, SessionError> {
        let config = self.config(thread_id);
        let updates = self.runtime.stream(input, config.clone()).await?;
        Ok(relay(self.runtime.clone(), config, updates).boxed())
    }
}

/// Validates the first task's first interrupt into action requests.
/// Returns `None` when the run reached a terminal step.
fn pending_requests(snapshot: &StateSnapshot) -> Result<Option<ActionRequests>, SessionError> {
    if !snapshot.has_pending_steps() {
        return Ok(None);
    }
    let interrupt = snapshot.first_interrupt().ok_or_else(|| {
        SessionError::MalformedInterrupt(format!(
            "run is waiting on {:?} but reports no interrupt",
            snapshot.next
        ))
    })?;
    let requests: ActionRequests = serde_json::from_value(interrupt.value.clone())
        .map_err(|err| SessionError::MalformedInterrupt(err.to_string()))?;
    Ok(Some(requests))
}

fn relay(
    runtime: Arc<dyn AgentRuntime>,
    config: RunConfig,
    mut updates: UpdateStream,
) -> impl Stream<Item = Result<StreamEvent, SessionError>> + Send + 'static {
    try_stream! {
        while let Some(update) = updates.next().await {
            let update = update?;
            let wrap: fn(Message) -> StreamEvent = match update.step {
                Step::Model => StreamEvent::ModelMessage,
                Step::Tools => StreamEvent::ToolMessage,
                Step::Other(_) => continue,
            };
            for message in update.messages {
                yield wrap(message);
            }
        }

        let snapshot = runtime.get_state(&config).await?;
        if let Some(requests) = pending_requests(&snapshot)? {
            tracing::info!(
                thread_id = %config.thread_id,
                count = requests.len(),
                "run suspended awaiting approval"
            );
            yield StreamEvent::ApprovalRequested(requests);
        }
    }
}
