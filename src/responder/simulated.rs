//! Placeholder responder used while no backend is connected

use super::{Responder, ResponderError};
use crate::model::{Message, Source};
use async_trait::async_trait;
use std::time::Duration;

/// Delay before a simulated reply resolves
pub const SIMULATED_REPLY_DELAY: Duration = Duration::from_millis(1500);

const SIMULATED_SOURCE_URI: &str = "#";

/// Responder that answers every prompt with a fixed template after a delay
#[derive(Debug, Clone)]
pub struct SimulatedResponder {
    delay: Duration,
}

impl SimulatedResponder {
    pub fn new() -> Self {
        Self::with_delay(SIMULATED_REPLY_DELAY)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The reply produced for `prompt`, without waiting
    pub fn reply_for(prompt: &str) -> Message {
        Message::model(format!(
            "This is a simulated response to: \"{prompt}\". The backend service is not connected."
        ))
        .with_sources(vec![
            Source::new("Simulated Location 1", SIMULATED_SOURCE_URI),
            Source::new("Simulated Location 2", SIMULATED_SOURCE_URI),
        ])
    }
}

impl Default for SimulatedResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Responder for SimulatedResponder {
    async fn generate(&self, prompt: &str) -> Result<Message, ResponderError> {
        if prompt.trim().is_empty() {
            return Err(ResponderError::invalid_request("Question is empty"));
        }
        tokio::time::sleep(self.delay).await;
        Ok(Self::reply_for(prompt))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
