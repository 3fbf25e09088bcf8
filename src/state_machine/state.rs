//! Generation state types

use serde::Serialize;
use std::fmt;

/// Tag of one reply request. Strictly increasing within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Whether a reply is in flight, and for which conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenState {
    /// No pending reply
    #[default]
    Idle,

    /// A reply task is running
    Generating {
        request_id: RequestId,
        /// Conversation that was active when the message was sent
        conversation_id: String,
    },
}

impl GenState {
    pub fn is_generating(&self) -> bool {
        matches!(self, GenState::Generating { .. })
    }

    /// Id of the pending request, if any
    pub fn pending_request(&self) -> Option<RequestId> {
        match self {
            GenState::Generating { request_id, .. } => Some(*request_id),
            GenState::Idle => None,
        }
    }
}
