//! Pure state transition function

use super::{Effect, Event, GenState, ReplyOutcome, RequestId};
use crate::model::Message;
use crate::responder::ResponderError;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: GenState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: GenState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(state: &GenState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User Messages
        // ============================================================
        (_, Event::UserMessage { text, .. }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyMessage)
        }

        // Idle + UserMessage -> Generating
        (
            GenState::Idle,
            Event::UserMessage {
                conversation_id,
                text,
                request_id,
            },
        ) => Ok(start_reply(conversation_id, text.trim(), request_id)),

        // Generating + UserMessage -> Generating (previous reply is cancelled first)
        (
            GenState::Generating {
                request_id: pending,
                conversation_id: pending_conversation,
            },
            Event::UserMessage {
                conversation_id,
                text,
                request_id,
            },
        ) => {
            let superseded = [
                Effect::AbortReply {
                    request_id: *pending,
                },
                Effect::generation_done(*pending, pending_conversation, ReplyOutcome::Cancelled),
            ];
            let started = start_reply(conversation_id, text.trim(), request_id);
            Ok(TransitionResult::new(started.new_state)
                .with_effects(superseded)
                .with_effects(started.effects))
        }

        // ============================================================
        // Cancellation
        // ============================================================
        (
            GenState::Generating {
                request_id,
                conversation_id,
            },
            Event::UserCancel,
        ) => Ok(TransitionResult::new(GenState::Idle)
            .with_effect(Effect::AbortReply {
                request_id: *request_id,
            })
            .with_effect(Effect::generation_done(
                *request_id,
                conversation_id,
                ReplyOutcome::Cancelled,
            ))),

        // Nothing pending: stop is a no-op
        (GenState::Idle, Event::UserCancel) => Ok(TransitionResult::new(GenState::Idle)),

        // ============================================================
        // Replies
        // ============================================================

        // The reply lands in the conversation captured at send time, even if
        // the user has since selected another one.
        (
            GenState::Generating {
                request_id,
                conversation_id,
            },
            Event::ReplyReady {
                request_id: reply_id,
                message,
                ..
            },
        ) if *request_id == reply_id => Ok(TransitionResult::new(GenState::Idle)
            .with_effect(Effect::append_message(conversation_id, message))
            .with_effect(Effect::generation_done(
                *request_id,
                conversation_id,
                ReplyOutcome::Delivered,
            ))),

        (
            GenState::Generating {
                request_id,
                conversation_id,
            },
            Event::ReplyFailed {
                request_id: reply_id,
                error,
                ..
            },
        ) if *request_id == reply_id => Ok(TransitionResult::new(GenState::Idle)
            .with_effect(Effect::append_message(
                conversation_id,
                failure_reply(&error),
            ))
            .with_effect(Effect::NotifyError {
                message: error.to_string(),
            })
            .with_effect(Effect::generation_done(
                *request_id,
                conversation_id,
                ReplyOutcome::Failed,
            ))),

        // Result of a cancelled or superseded request: discard
        (state, Event::ReplyReady { .. } | Event::ReplyFailed { .. }) => {
            Ok(TransitionResult::new(state.clone()))
        }
    }
}

fn start_reply(conversation_id: String, text: &str, request_id: RequestId) -> TransitionResult {
    TransitionResult::new(GenState::Generating {
        request_id,
        conversation_id: conversation_id.clone(),
    })
    .with_effect(Effect::append_message(&conversation_id, Message::user(text)))
    .with_effect(Effect::RequestReply {
        request_id,
        conversation_id: conversation_id.clone(),
        prompt: text.to_string(),
    })
    .with_effect(Effect::NotifyGenerationStarted {
        request_id,
        conversation_id,
    })
}

/// Model message shown in place of a reply that could not be generated
pub fn failure_reply(error: &ResponderError) -> Message {
    Message::model(format!(
        "Sorry, I couldn't generate a response ({}): {}",
        error.kind.as_str(),
        error.message
    ))
}
