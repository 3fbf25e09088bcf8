//! Effects produced by state transitions

use super::state::RequestId;
use crate::model::Message;

/// How a reply request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Delivered,
    Failed,
    Cancelled,
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a message to a conversation in the store
    AppendMessage {
        conversation_id: String,
        message: Message,
    },

    /// Start the reply task
    RequestReply {
        request_id: RequestId,
        conversation_id: String,
        prompt: String,
    },

    /// Cancel the running reply task; its result must never be applied
    AbortReply { request_id: RequestId },

    /// Tell subscribers a reply is being generated
    NotifyGenerationStarted {
        request_id: RequestId,
        conversation_id: String,
    },

    /// Tell subscribers generation has stopped
    NotifyGenerationDone {
        request_id: RequestId,
        conversation_id: String,
        outcome: ReplyOutcome,
    },

    /// Surface an error notification
    NotifyError { message: String },
}

impl Effect {
    pub fn append_message(conversation_id: impl Into<String>, message: Message) -> Self {
        Effect::AppendMessage {
            conversation_id: conversation_id.into(),
            message,
        }
    }

    pub fn generation_done(
        request_id: RequestId,
        conversation_id: impl Into<String>,
        outcome: ReplyOutcome,
    ) -> Self {
        Effect::NotifyGenerationDone {
            request_id,
            conversation_id: conversation_id.into(),
            outcome,
        }
    }
}
