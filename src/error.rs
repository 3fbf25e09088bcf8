//! Session error types

use crate::state_machine::TransitionError;
use thiserror::Error;

/// Reasons a user intent was not applied.
///
/// None of these leave the session in a different state than before the
/// call. Front ends are expected to prevent them and may ignore them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("No active conversation")]
    NoActiveConversation,
    #[error("Unknown conversation: {0}")]
    UnknownConversation(String),
    #[error(transparent)]
    Rejected(#[from] TransitionError),
}
