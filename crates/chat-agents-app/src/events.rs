use chat_agents_core::hitl::ActionRequests;
use chat_agents_core::messaging::Message;

/// One item of a session event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A message written by the model step.
    ModelMessage(Message),
    /// A message written by the tools step.
    ToolMessage(Message),
    /// The run stopped for review. Always the last event of its stream.
    ApprovalRequested(ActionRequests),
}

impl StreamEvent {
    pub fn message(&self) -> Option<&Message> {
        match self {
            StreamEvent::ModelMessage(message) | StreamEvent::ToolMessage(message) => Some(message),
            StreamEvent::ApprovalRequested(_) => None,
        }
    }

    pub fn is_approval_request(&self) -> bool {
        matches!(self, StreamEvent::ApprovalRequested(_))
    }
}
