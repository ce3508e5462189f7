//! Core traits and shared data models for chat agents.
//! This crate defines the typed boundary between a session controller and an
//! agent runtime: messages, interrupt payloads, state snapshots and the
//! collaborator traits (runtime, model, tools, middleware, checkpointer).

pub mod hitl;
pub mod llm;
pub mod messaging;
pub mod middleware;
pub mod model;
pub mod persistence;
pub mod runtime;
pub mod tools;

pub use hitl::{
    ActionRequest, ActionRequests, Decision, DecisionType, EditedAction, HitlRequest,
    InterruptOnConfig, ResumeCommand, ReviewConfig,
};
pub use llm::{LanguageModel, ModelRequest};
pub use messaging::{
    CacheControl, Message, MessageContent, MessageRole, ToolCall, ToolStatus,
};
pub use middleware::{AgentMiddleware, StatePatch};
pub use model::{ModelId, ModelIdError, ModelProfile};
pub use persistence::{Checkpointer, InMemoryCheckpointer, SuspendedRun, ThreadId, ThreadState};
pub use runtime::{
    AgentRuntime, Interrupt, PendingTask, RunConfig, RunContext, RunInput, StateSnapshot,
    StateValues, Step, StepUpdate, UpdateStream,
};
pub use tools::{Tool, ToolBox, ToolSchema};
