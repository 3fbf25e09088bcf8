//! Reply generation abstraction
//!
//! The `Responder` trait is the seam between the chat session and whatever
//! produces model replies. The session only relies on this contract, so the
//! simulated implementation can be swapped for a real backend client.

mod error;
mod simulated;

pub use error::{ResponderError, ResponderErrorKind};
pub use simulated::{SimulatedResponder, SIMULATED_REPLY_DELAY};

use crate::model::Message;
use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for reply generators
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce a model reply to `prompt`.
    ///
    /// Implementations need not watch for cancellation: the session drops
    /// the future when the user stops generating.
    async fn generate(&self, prompt: &str) -> Result<Message, ResponderError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Responder + ?Sized> Responder for Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<Message, ResponderError> {
        (**self).generate(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Logging wrapper for responders
pub struct LoggingResponder<R> {
    inner: R,
}

impl<R: Responder> LoggingResponder<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: Responder> Responder for LoggingResponder<R> {
    async fn generate(&self, prompt: &str) -> Result<Message, ResponderError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate(prompt).await;
        let duration = start.elapsed();

        match &result {
            Ok(message) => {
                tracing::info!(
                    responder = %self.inner.name(),
                    duration_ms = %duration.as_millis(),
                    reply_chars = message.text.chars().count(),
                    sources = message.sources().len(),
                    "Reply generated"
                );
            }
            Err(e) => {
                tracing::error!(
                    responder = %self.inner.name(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = e.kind.as_str(),
                    "Reply generation failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
