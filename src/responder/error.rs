//! Responder error types

use thiserror::Error;

/// Responder error with classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ResponderError {
    pub kind: ResponderErrorKind,
    pub message: String,
}

impl ResponderError {
    pub fn new(kind: ResponderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ResponderErrorKind::Network, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ResponderErrorKind::Unavailable, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ResponderErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ResponderErrorKind::Unknown, message)
    }
}

/// Error classification for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderErrorKind {
    /// Backend could not be reached
    Network,
    /// Backend reachable but not ready to answer (e.g. index still loading)
    Unavailable,
    /// Backend refused the prompt
    InvalidRequest,
    Unknown,
}

impl ResponderErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Unavailable => "unavailable",
            Self::InvalidRequest => "invalid_request",
            Self::Unknown => "unknown",
        }
    }
}
