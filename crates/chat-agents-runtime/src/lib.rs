//! In-process agent runtime: a model/tools loop with before-model middleware,
//! human-in-the-loop interrupts, checkpointing and filesystem tools.

pub mod agent;
pub mod backends;
pub mod middleware;
pub mod prompts;
pub mod registry;
pub mod tools;

pub use agent::{
    create_agent, create_deep_agent, Agent, AgentBuilder, AgentConfig, DeepAgentParams,
};
pub use backends::{Backend, BackendError, FileInfo, FilesystemBackend, InMemoryBackend};
pub use middleware::{
    before_model_fn, BaseSystemPromptMiddleware, FilesystemMiddleware, HumanInLoopMiddleware,
    LoggingMiddleware, PromptCachingMiddleware,
};
pub use registry::{ModelFactory, ModelRegistry};
pub use tools::{create_filesystem_tools, SharedBackend};
