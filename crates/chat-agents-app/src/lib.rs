//! Session layer for chat agents: a controller that drives runs and handles
//! approve/reject interrupts, the chat front-end state, and demo agents.

pub mod controller;
pub mod demos;
pub mod error;
pub mod events;
pub mod render;
pub mod rules;
pub mod ui;

pub use controller::{EventStream, SessionController};
pub use error::SessionError;
pub use events::StreamEvent;
pub use rules::RuleBasedModel;
pub use ui::UiSession;
