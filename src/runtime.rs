//! Runtime for a chat session
//!
//! Owns the conversation store and the generation state, executes the
//! effects produced by the state machine, and streams notifications to the
//! presentation layer.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::model::Message;
use crate::responder::{LoggingResponder, SimulatedResponder};
use crate::state_machine::ReplyOutcome;

/// Runtime wired to the placeholder responder
pub type SimulatedRuntime = SessionRuntime<LoggingResponder<SimulatedResponder>>;

/// Events sent to presentation subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ConversationCreated {
        conversation_id: String,
    },
    ConversationSelected {
        conversation_id: String,
    },
    MessageAppended {
        conversation_id: String,
        message: Message,
    },
    GenerationStarted {
        conversation_id: String,
    },
    GenerationDone {
        conversation_id: String,
        outcome: ReplyOutcome,
    },
    Error {
        message: String,
    },
}
