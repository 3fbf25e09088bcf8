//! Events that drive the generation state machine

use super::state::RequestId;
use crate::model::Message;
use crate::responder::ResponderError;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        /// Active conversation at send time
        conversation_id: String,
        text: String,
        /// Id for the reply request this message starts
        request_id: RequestId,
    },
    UserCancel,

    // Responder events
    ReplyReady {
        request_id: RequestId,
        conversation_id: String,
        message: Message,
    },
    ReplyFailed {
        request_id: RequestId,
        conversation_id: String,
        error: ResponderError,
    },
}

impl Event {
    /// Request id carried by a responder event
    pub fn reply_request_id(&self) -> Option<RequestId> {
        match self {
            Event::ReplyReady { request_id, .. } | Event::ReplyFailed { request_id, .. } => {
                Some(*request_id)
            }
            Event::UserMessage { .. } | Event::UserCancel => None,
        }
    }
}
