//! Mock implementations for testing
//!
//! These mocks enable session testing without the simulated delay or a backend.

use crate::model::Message;
use crate::responder::{Responder, ResponderError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock Responder
// ============================================================================

/// Mock responder that returns queued results immediately
pub struct MockResponder {
    results: Mutex<VecDeque<Result<Message, ResponderError>>>,
    /// Record of all prompts received
    pub prompts: Mutex<Vec<String>>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, message: Message) {
        self.results.lock().unwrap().push_back(Ok(message));
    }

    /// Queue an error
    pub fn queue_error(&self, error: ResponderError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded prompts
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn generate(&self, prompt: &str) -> Result<Message, ResponderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ResponderError::unknown("No mock reply queued")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Delayed Mock Responder (for cancellation testing)
// ============================================================================

/// Mock responder with configurable delay that counts finished replies
pub struct DelayedMockResponder {
    inner: MockResponder,
    delay: Duration,
    /// Notified when a request starts
    pub request_started: Arc<Notify>,
    /// Replies whose delay ran to completion
    pub completed: AtomicUsize,
}

impl DelayedMockResponder {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockResponder::new(),
            delay,
            request_started: Arc::new(Notify::new()),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn queue_reply(&self, message: Message) {
        self.inner.queue_reply(message);
    }

    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Responder for DelayedMockResponder {
    async fn generate(&self, prompt: &str) -> Result<Message, ResponderError> {
        self.request_started.notify_waiters();
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.inner.generate(prompt).await
    }

    fn name(&self) -> &str {
        "delayed-mock"
    }
}

// ============================================================================
// Panicking Responder
// ============================================================================

/// Responder whose `generate` always panics
pub struct PanickingResponder;

#[async_trait]
impl Responder for PanickingResponder {
    async fn generate(&self, _prompt: &str) -> Result<Message, ResponderError> {
        panic!("responder blew up");
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::model::{Role, DEFAULT_TITLE};
    use crate::responder::{SimulatedResponder, SIMULATED_REPLY_DELAY};
    use crate::runtime::{SessionEvent, SessionRuntime};
    use crate::state_machine::{ReplyOutcome, TransitionError};
    use std::collections::HashSet;

    /// Let spawned reply tasks run without advancing time
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn collect_events(rx: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_reply_scenario() {
        let mut rt = SessionRuntime::new(SimulatedResponder::new());
        let conv_id = rt.create_conversation();

        rt.send_user_message("Tell me about Paris").unwrap();
        assert!(rt.is_generating());

        // Nothing arrives before the delay has elapsed
        let early = tokio::time::timeout(
            SIMULATED_REPLY_DELAY - Duration::from_millis(10),
            rt.recv_event(),
        )
        .await;
        assert!(early.is_err());
        assert!(rt.is_generating());

        tokio::time::advance(Duration::from_millis(10)).await;
        let event = rt.recv_event().await;
        rt.handle_event(event);

        assert!(!rt.is_generating());
        let messages = rt.conversation(&conv_id).unwrap().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::user("Tell me about Paris"));
        assert_eq!(messages[1].role, Role::Model);
        assert!(messages[1].text.contains("Tell me about Paris"));
        let titles: Vec<&str> = messages[1]
            .sources()
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Simulated Location 1", "Simulated Location 2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_suppresses_reply() {
        let mut rt = SessionRuntime::new(SimulatedResponder::new());
        rt.create_conversation();

        rt.send_user_message("Hi").unwrap();
        assert!(rt.stop_generating());
        assert!(!rt.is_generating());

        tokio::time::advance(SIMULATED_REPLY_DELAY).await;
        let late = tokio::time::timeout(Duration::from_secs(5), rt.recv_event()).await;
        assert!(late.is_err());

        assert_eq!(rt.active_messages(), &[Message::user("Hi")]);
        assert!(!rt.is_generating());
    }

    #[tokio::test]
    async fn test_stop_discards_reply_already_queued() {
        let mock = MockResponder::new();
        mock.queue_reply(Message::model("instant"));
        let mut rt = SessionRuntime::new(mock);
        rt.create_conversation();

        rt.send_user_message("Hi").unwrap();
        settle().await;
        rt.stop_generating();

        // The reply was sent before the stop but must not be applied
        assert_eq!(rt.drain_ready(), 1);
        assert_eq!(rt.active_messages(), &[Message::user("Hi")]);
        assert!(!rt.is_generating());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut rt = SessionRuntime::new(MockResponder::new());
        rt.create_conversation();
        assert!(!rt.stop_generating());
        assert!(!rt.stop_generating());
        assert!(!rt.is_generating());
    }

    #[tokio::test]
    async fn test_blank_messages_ignored() {
        let mock = Arc::new(MockResponder::new());
        let mut rt = SessionRuntime::new(mock.clone());
        rt.create_conversation();

        for text in ["", "   "] {
            let err = rt.send_user_message(text).unwrap_err();
            assert_eq!(err, SessionError::Rejected(TransitionError::EmptyMessage));
        }
        assert!(rt.active_messages().is_empty());
        assert!(!rt.is_generating());
        settle().await;
        assert!(mock.recorded_prompts().is_empty());
    }

    #[tokio::test]
    async fn test_send_without_conversation_rejected() {
        let mut rt = SessionRuntime::new(MockResponder::new());
        assert_eq!(
            rt.send_user_message("Hello").unwrap_err(),
            SessionError::NoActiveConversation
        );
        assert!(!rt.is_generating());
        assert!(rt.conversations().is_empty());
    }

    #[tokio::test]
    async fn test_create_conversations() {
        let mut rt = SessionRuntime::new(MockResponder::new());
        let mut ids = Vec::new();
        for _ in 0..25 {
            let id = rt.create_conversation();
            assert_eq!(rt.conversations()[0].id(), id);
            assert_eq!(rt.active_conversation_id(), Some(id.as_str()));
            ids.push(id);
        }
        assert_eq!(rt.conversations().len(), 25);
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 25);
        assert!(rt.conversations().iter().all(|c| c.title() == DEFAULT_TITLE));
        assert!(!rt.conversation_started());
    }

    #[tokio::test]
    async fn test_select_unknown_conversation() {
        let mut rt = SessionRuntime::new(MockResponder::new());
        let id = rt.create_conversation();
        assert!(matches!(
            rt.select_conversation("convo-0"),
            Err(SessionError::UnknownConversation(_))
        ));
        assert_eq!(rt.active_conversation_id(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_title_frozen_after_first_message() {
        let mock = MockResponder::new();
        mock.queue_reply(Message::model("one"));
        mock.queue_reply(Message::model("two"));
        let mut rt = SessionRuntime::new(mock);
        rt.create_conversation();

        rt.send_user_message("Where is the Atacama desert located?")
            .unwrap();
        rt.wait_until_idle().await;
        assert_eq!(
            rt.active_conversation().unwrap().title(),
            "Where is the Atacama desert lo"
        );
        assert!(rt.conversation_started());

        rt.send_user_message("And how dry is it?").unwrap();
        rt.wait_until_idle().await;
        assert_eq!(
            rt.active_conversation().unwrap().title(),
            "Where is the Atacama desert lo"
        );
        assert_eq!(rt.active_messages().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_lands_in_originating_conversation() {
        let mut rt = SessionRuntime::new(SimulatedResponder::new());
        let first = rt.create_conversation();
        rt.send_user_message("Where is Kyoto?").unwrap();

        let second = rt.create_conversation();
        assert_eq!(rt.active_conversation_id(), Some(second.as_str()));

        rt.wait_until_idle().await;

        assert_eq!(rt.conversation(&first).unwrap().messages().len(), 2);
        assert!(rt.conversation(&second).unwrap().is_empty());
        assert_eq!(rt.active_conversation_id(), Some(second.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_generating_replaces_pending_reply() {
        let responder = Arc::new(DelayedMockResponder::new(Duration::from_millis(500)));
        responder.queue_reply(Message::model("first answer"));
        responder.queue_reply(Message::model("second answer"));
        let mut rt = SessionRuntime::new(responder.clone());
        rt.create_conversation();

        rt.send_user_message("one").unwrap();
        settle().await;
        rt.send_user_message("two").unwrap();
        rt.wait_until_idle().await;

        // The first request never finished its delay
        assert_eq!(responder.completed_count(), 1);
        let texts: Vec<&str> = rt.active_messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "first answer"]);

        let late = tokio::time::timeout(Duration::from_secs(5), rt.recv_event()).await;
        assert!(late.is_err());
    }

    #[tokio::test]
    async fn test_failure_surfaces_as_model_message() {
        let mock = MockResponder::new();
        mock.queue_error(ResponderError::unavailable("Vector store is still loading"));
        let mut rt = SessionRuntime::new(mock);
        let mut events = rt.subscribe();
        rt.create_conversation();

        rt.send_user_message("What is a geoid?").unwrap();
        rt.wait_until_idle().await;

        let messages = rt.active_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Model);
        assert!(messages[1].text.contains("Vector store is still loading"));

        let events = collect_events(&mut events);
        assert!(events.contains(&SessionEvent::Error {
            message: "Vector store is still loading".to_string()
        }));
        assert!(matches!(
            events.last(),
            Some(SessionEvent::GenerationDone {
                outcome: ReplyOutcome::Failed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_responder_panic_ends_generation() {
        let mut rt = SessionRuntime::new(PanickingResponder);
        let mut events = rt.subscribe();
        let conv_id = rt.create_conversation();

        rt.send_user_message("Hi").unwrap();
        tokio::time::timeout(Duration::from_secs(5), rt.wait_until_idle())
            .await
            .expect("session should settle after a responder panic");

        assert!(!rt.is_generating());
        let messages = rt.conversation(&conv_id).unwrap().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::user("Hi"));
        assert_eq!(messages[1].role, Role::Model);
        assert!(messages[1].text.contains("crashed"));

        let events = collect_events(&mut events);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::Error { .. })));
        assert!(matches!(
            events.last(),
            Some(SessionEvent::GenerationDone {
                outcome: ReplyOutcome::Failed,
                ..
            })
        ));

        // The session accepts the next message
        assert!(rt.send_user_message("Again").is_ok());
        assert!(rt.is_generating());
    }

    #[tokio::test]
    async fn test_notification_sequence() {
        let mock = MockResponder::new();
        mock.queue_reply(Message::model("Answer"));
        let mut rt = SessionRuntime::new(mock);
        let mut events = rt.subscribe();

        let conv_id = rt.create_conversation();
        rt.send_user_message("Question").unwrap();
        rt.wait_until_idle().await;

        assert_eq!(
            collect_events(&mut events),
            vec![
                SessionEvent::ConversationCreated {
                    conversation_id: conv_id.clone()
                },
                SessionEvent::MessageAppended {
                    conversation_id: conv_id.clone(),
                    message: Message::user("Question"),
                },
                SessionEvent::GenerationStarted {
                    conversation_id: conv_id.clone()
                },
                SessionEvent::MessageAppended {
                    conversation_id: conv_id.clone(),
                    message: Message::model("Answer"),
                },
                SessionEvent::GenerationDone {
                    conversation_id: conv_id,
                    outcome: ReplyOutcome::Delivered,
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_reply() {
        let responder = Arc::new(DelayedMockResponder::new(Duration::from_millis(200)));
        responder.queue_reply(Message::model("never"));
        let mut rt = SessionRuntime::new(responder.clone());
        rt.create_conversation();

        rt.send_user_message("Hello").unwrap();
        settle().await;
        drop(rt);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(responder.completed_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_responder() {
        let mock = MockResponder::new();
        mock.queue_reply(Message::model("Hello"));

        let reply = mock.generate("hi").await.unwrap();
        assert_eq!(reply.text, "Hello");

        // Second call should fail (no more replies)
        assert!(mock.generate("hi").await.is_err());
        assert_eq!(mock.recorded_prompts(), vec!["hi", "hi"]);
    }
}
