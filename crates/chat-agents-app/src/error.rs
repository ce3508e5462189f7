use chat_agents_core::persistence::ThreadId;
use thiserror::Error;

/// Errors surfaced by [`SessionController`](crate::SessionController).
#[derive(Debug, Error)]
pub enum SessionError {
    /// The thread is suspended on an approval and cannot take new messages.
    #[error("thread {thread_id} is awaiting approval; approve or reject the pending action first")]
    InvalidThread { thread_id: ThreadId },

    /// Approve, reject or decide was called with nothing pending.
    #[error("thread {thread_id} has no pending approval")]
    NoPendingApproval { thread_id: ThreadId },

    /// Explicit decisions do not line up with the pending action requests.
    #[error("expected {expected} decisions for the pending action requests, got {actual}")]
    DecisionCountMismatch { expected: usize, actual: usize },

    /// The runtime reported an interrupt whose payload is not an action request set.
    #[error("malformed interrupt payload: {0}")]
    MalformedInterrupt(String),

    /// Failure from the agent runtime, passed through unchanged.
    #[error(transparent)]
    Runtime(#[from] anyhow::Error),
}
