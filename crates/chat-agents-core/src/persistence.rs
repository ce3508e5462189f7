//! Persistence traits for checkpointing thread state between runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::hitl::HitlRequest;
use crate::messaging::{Message, ToolCall};

/// Unique identifier for a conversation thread.
pub type ThreadId = String;

/// Everything a runtime needs to continue a thread: its messages and, when
/// the last run stopped for review, the suspended tool calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ThreadState {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended: Option<SuspendedRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A run paused after the model asked for tools that need human review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuspendedRun {
    pub interrupt_id: String,
    pub request: HitlRequest,
    /// Every tool call of the suspending assistant message, in order.
    pub tool_calls: Vec<ToolCall>,
    pub created_at: DateTime<Utc>,
}

impl ThreadState {
    pub fn is_suspended(&self) -> bool {
        self.suspended.is_some()
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

/// Trait for persisting and retrieving thread state between runs.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Save the current state for a given thread.
    async fn save_state(&self, thread_id: &ThreadId, state: &ThreadState) -> anyhow::Result<()>;

    /// Load the last saved state for a given thread.
    /// Returns None if no state exists for this thread.
    async fn load_state(&self, thread_id: &ThreadId) -> anyhow::Result<Option<ThreadState>>;

    /// Delete all saved state for a given thread.
    async fn delete_thread(&self, thread_id: &ThreadId) -> anyhow::Result<()>;

    /// List all thread IDs that have saved state.
    async fn list_threads(&self) -> anyhow::Result<Vec<ThreadId>>;
}

/// In-memory checkpointer for demos and tests.
/// State is not persisted between process restarts.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    states: std::sync::RwLock<HashMap<ThreadId, ThreadState>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save_state(&self, thread_id: &ThreadId, state: &ThreadState) -> anyhow::Result<()> {
        let mut states = self.states.write().map_err(|_| {
            anyhow::anyhow!("Failed to acquire write lock on in-memory checkpointer")
        })?;
        states.insert(thread_id.clone(), state.clone());
        tracing::debug!(thread_id = %thread_id, messages = state.messages.len(), "Saved thread state to memory");
        Ok(())
    }

    async fn load_state(&self, thread_id: &ThreadId) -> anyhow::Result<Option<ThreadState>> {
        let states = self.states.read().map_err(|_| {
            anyhow::anyhow!("Failed to acquire read lock on in-memory checkpointer")
        })?;
        Ok(states.get(thread_id).cloned())
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> anyhow::Result<()> {
        let mut states = self.states.write().map_err(|_| {
            anyhow::anyhow!("Failed to acquire write lock on in-memory checkpointer")
        })?;
        states.remove(thread_id);
        tracing::debug!(thread_id = %thread_id, "Deleted thread from memory");
        Ok(())
    }

    async fn list_threads(&self) -> anyhow::Result<Vec<ThreadId>> {
        let states = self.states.read().map_err(|_| {
            anyhow::anyhow!("Failed to acquire read lock on in-memory checkpointer")
        })?;
        Ok(states.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hitl::ActionRequest;
    use serde_json::json;

    fn suspended_state() -> ThreadState {
        let call = ToolCall::new("write_file", json!({"file_path": "/a.txt", "content": "x"}));
        let mut state = ThreadState {
            messages: vec![
                Message::human("write a file"),
                Message::assistant_with_tool_calls("", vec![call.clone()]),
            ],
            suspended: Some(SuspendedRun {
                interrupt_id: "interrupt-1".into(),
                request: HitlRequest {
                    action_requests: vec![ActionRequest::from_tool_call(&call, None)],
                    review_configs: vec![],
                },
                tool_calls: vec![call],
                created_at: Utc::now(),
            }),
            updated_at: None,
        };
        state.touch();
        state
    }

    #[tokio::test]
    async fn in_memory_checkpointer_save_and_load() {
        let checkpointer = InMemoryCheckpointer::new();
        let thread_id = "test-thread".to_string();
        let state = suspended_state();

        checkpointer.save_state(&thread_id, &state).await.unwrap();

        let loaded = checkpointer.load_state(&thread_id).await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(loaded.is_suspended());
        assert!(loaded.updated_at.is_some());
    }

    #[tokio::test]
    async fn in_memory_checkpointer_nonexistent_thread() {
        let checkpointer = InMemoryCheckpointer::new();
        let result = checkpointer
            .load_state(&"nonexistent".to_string())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn in_memory_checkpointer_delete_thread() {
        let checkpointer = InMemoryCheckpointer::new();
        let thread_id = "test-thread".to_string();

        checkpointer
            .save_state(&thread_id, &suspended_state())
            .await
            .unwrap();
        assert!(checkpointer.load_state(&thread_id).await.unwrap().is_some());

        checkpointer.delete_thread(&thread_id).await.unwrap();
        assert!(checkpointer.load_state(&thread_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn in_memory_checkpointer_list_threads() {
        let checkpointer = InMemoryCheckpointer::new();
        let state = ThreadState::default();

        checkpointer
            .save_state(&"thread1".to_string(), &state)
            .await
            .unwrap();
        checkpointer
            .save_state(&"thread2".to_string(), &state)
            .await
            .unwrap();

        let threads = checkpointer.list_threads().await.unwrap();
        assert_eq!(threads.len(), 2);
        assert!(threads.contains(&"thread1".to_string()));
        assert!(threads.contains(&"thread2".to_string()));
    }
}
