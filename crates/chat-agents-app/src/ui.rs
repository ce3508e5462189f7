//! Chat front-end state: the active thread and whether an approval is
//! outstanding. Typed input while an approval is pending is treated as
//! rejection feedback.

use std::sync::Arc;

use chat_agents_core::hitl::ActionRequests;
use chat_agents_core::messaging::Message;
use chat_agents_core::persistence::ThreadId;
use chat_agents_core::runtime::RunContext;
use futures::StreamExt;

use crate::controller::{EventStream, SessionController};
use crate::error::SessionError;
use crate::events::StreamEvent;

pub struct UiSession {
    controller: Arc<SessionController>,
    thread_id: ThreadId,
    show_approve_button: bool,
}

impl UiSession {
    /// Opens a session on a fresh thread. `user_id`, when given, is passed to
    /// middleware as part of the run context.
    pub fn new(controller: SessionController, user_id: Option<String>) -> Self {
        let controller = match user_id {
            Some(user_id) => controller.with_context(RunContext::for_user(user_id)),
            None => controller,
        };
        let mut session = Self {
            controller: Arc::new(controller),
            thread_id: ThreadId::new(),
            show_approve_button: false,
        };
        session.new_thread();
        session
    }

    /// Switches to a new random thread id and clears the approval flag.
    pub fn new_thread(&mut self) -> &str {
        self.thread_id = uuid::Uuid::new_v4().simple().to_string();
        self.show_approve_button = false;
        self.controller.start(&self.thread_id);
        tracing::info!(thread_id = %self.thread_id, "new thread");
        &self.thread_id
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn show_approve_button(&self) -> bool {
        self.show_approve_button
    }

    /// Sends `input` as a message, or as rejection feedback while an
    /// approval is pending. Events are handed to `on_event` as they arrive.
    pub async fn submit(
        &mut self,
        input: &str,
        on_event: impl FnMut(&StreamEvent),
    ) -> Result<(), SessionError> {
        let stream = if self.show_approve_button {
            self.show_approve_button = false;
            self.controller.reject(input, &self.thread_id).await?
        } else {
            self.controller.send(input, &self.thread_id).await?
        };
        self.drain(stream, on_event).await
    }

    /// Approves the pending action requests and resumes the run.
    pub async fn approve(&mut self, on_event: impl FnMut(&StreamEvent)) -> Result<(), SessionError> {
        self.show_approve_button = false;
        let stream = self.controller.approve(&self.thread_id).await?;
        self.drain(stream, on_event).await
    }

    /// Re-reads the approval flag from the thread state.
    pub async fn refresh(&mut self) -> Result<bool, SessionError> {
        self.show_approve_button = self.controller.is_awaiting_approval(&self.thread_id).await?;
        Ok(self.show_approve_button)
    }

    pub async fn history(&self) -> Result<Vec<Message>, SessionError> {
        self.controller.get_history(&self.thread_id).await
    }

    pub async fn pending(&self) -> Result<Option<ActionRequests>, SessionError> {
        self.controller.pending_approval(&self.thread_id).await
    }

    async fn drain(
        &mut self,
        mut stream: EventStream,
        mut on_event: impl FnMut(&StreamEvent),
    ) -> Result<(), SessionError> {
        while let Some(event) = stream.next().await {
            let event = event?;
            if event.is_approval_request() {
                self.show_approve_button = true;
            }
            on_event(&event);
        }
        Ok(())
    }
}
