//! Agent construction and the in-process runtime.
//!
//! - `api`: `create_agent` and `create_deep_agent`
//! - `builder`: fluent `AgentBuilder`
//! - `config`: configuration structs
//! - `runtime`: the `Agent` run loop implementing `AgentRuntime`

pub mod api;
pub mod builder;
pub mod config;
pub mod runtime;

pub use api::{create_agent, create_deep_agent};
pub use builder::AgentBuilder;
pub use config::{AgentConfig, DeepAgentParams, DEFAULT_MAX_ITERATIONS};
pub use runtime::{Agent, REVIEW_TASK_NAME};
