//! Chat session runtime executor

use super::SessionEvent;
use crate::error::SessionError;
use crate::model::{Conversation, Message};
use crate::responder::{Responder, ResponderError};
use crate::state_machine::{transition, Effect, Event, GenState, RequestId, TransitionError};
use crate::store::ConversationStore;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

/// The pending reply task
struct PendingReply {
    request_id: RequestId,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PendingReply {
    fn cancel(self) {
        self.cancel_token.cancel();
        self.handle.abort();
    }
}

/// Single owner of all session state.
///
/// Intents (`create_conversation`, `select_conversation`,
/// `send_user_message`, `stop_generating`) apply synchronously. Replies
/// arrive on an internal channel; the front end awaits them with
/// [`SessionRuntime::recv_event`] and applies them with
/// [`SessionRuntime::handle_event`].
///
/// Sending a message spawns a Tokio task, so intents must be invoked from
/// within a Tokio runtime.
pub struct SessionRuntime<R>
where
    R: Responder + 'static,
{
    store: ConversationStore,
    state: GenState,
    responder: Arc<R>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    pending: Option<PendingReply>,
    last_request_id: RequestId,
}

impl<R> SessionRuntime<R>
where
    R: Responder + 'static,
{
    pub fn new(responder: R) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        Self {
            store: ConversationStore::new(),
            state: GenState::Idle,
            responder: Arc::new(responder),
            event_rx,
            event_tx,
            broadcast_tx,
            pending: None,
            last_request_id: RequestId(0),
        }
    }

    /// Subscribe to session notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Create an empty conversation, put it first and make it active
    pub fn create_conversation(&mut self) -> String {
        let conversation_id = self.store.create_conversation();
        tracing::info!(conv_id = %conversation_id, "New conversation");
        self.notify(SessionEvent::ConversationCreated {
            conversation_id: conversation_id.clone(),
        });
        conversation_id
    }

    /// Make `id` the active conversation.
    ///
    /// Unknown ids are rejected and leave the selection unchanged. A pending
    /// reply keeps running and lands in the conversation it was sent from.
    pub fn select_conversation(&mut self, id: &str) -> Result<(), SessionError> {
        self.store.select_conversation(id)?;
        tracing::debug!(conv_id = %id, "Selected conversation");
        self.notify(SessionEvent::ConversationSelected {
            conversation_id: id.to_string(),
        });
        Ok(())
    }

    /// Send `text` to the active conversation and start a reply.
    ///
    /// Rejected without any change when there is no active conversation or
    /// the text is blank. A reply still pending from an earlier message is
    /// cancelled first.
    pub fn send_user_message(&mut self, text: &str) -> Result<RequestId, SessionError> {
        let conversation_id = self
            .store
            .active_id()
            .ok_or(SessionError::NoActiveConversation)?
            .to_string();
        let request_id = self.last_request_id.next();

        self.process_event(Event::UserMessage {
            conversation_id,
            text: text.to_string(),
            request_id,
        })?;
        self.last_request_id = request_id;
        Ok(request_id)
    }

    /// Cancel the pending reply, if any. Returns whether one was cancelled.
    ///
    /// Once this returns, the cancelled reply can no longer change the session.
    pub fn stop_generating(&mut self) -> bool {
        let was_generating = self.state.is_generating();
        // Idle + UserCancel and Generating + UserCancel are both valid
        if let Err(e) = self.process_event(Event::UserCancel) {
            tracing::error!(error = %e, "Cancel rejected");
        }
        was_generating
    }

    // ========================================================================
    // Reply delivery
    // ========================================================================

    /// Wait for the next responder event.
    ///
    /// Cancel safe. Pends forever while nothing is in flight.
    pub async fn recv_event(&mut self) -> Event {
        match self.event_rx.recv().await {
            Some(event) => event,
            // The runtime holds a sender, so the channel never closes
            None => std::future::pending().await,
        }
    }

    /// Apply a responder event. Results of cancelled or superseded requests
    /// are discarded.
    pub fn handle_event(&mut self, event: Event) {
        let request_id = event.reply_request_id();
        if request_id.is_some() && request_id != self.state.pending_request() {
            tracing::debug!(request_id = ?request_id, "Discarding stale reply");
        }
        if let Err(e) = self.process_event(event) {
            tracing::error!(error = %e, "Error handling event");
            self.notify(SessionEvent::Error {
                message: e.to_string(),
            });
        }
    }

    /// Apply every responder event that has already arrived, without waiting.
    /// Returns how many were applied.
    pub fn drain_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    /// Wait until the pending reply, if any, has been delivered
    pub async fn wait_until_idle(&mut self) {
        while self.state.is_generating() {
            let event = self.recv_event().await;
            self.handle_event(event);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// All conversations, most recently created first
    pub fn conversations(&self) -> &[Conversation] {
        self.store.conversations()
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.store.get(id)
    }

    pub fn active_conversation_id(&self) -> Option<&str> {
        self.store.active_id()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.store.active()
    }

    /// Messages of the active conversation, empty if there is none
    pub fn active_messages(&self) -> &[Message] {
        self.store.active().map(Conversation::messages).unwrap_or_default()
    }

    pub fn is_generating(&self) -> bool {
        self.state.is_generating()
    }

    /// Whether the active conversation has any messages yet
    pub fn conversation_started(&self) -> bool {
        self.store.active().is_some_and(|c| !c.is_empty())
    }

    pub fn state(&self) -> &GenState {
        &self.state
    }

    // ========================================================================
    // State machine plumbing
    // ========================================================================

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        // Pure state transition
        let result = transition(&self.state, event)?;

        let old_state = std::mem::replace(&mut self.state, result.new_state);
        if old_state != self.state {
            tracing::debug!(from = ?old_state, to = ?self.state, "State transition");
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage {
                conversation_id,
                message,
            } => {
                if let Err(e) = self
                    .store
                    .append_message(&conversation_id, message.clone())
                {
                    tracing::warn!(error = %e, "Dropping message for missing conversation");
                    return;
                }
                self.notify(SessionEvent::MessageAppended {
                    conversation_id,
                    message,
                });
            }

            Effect::RequestReply {
                request_id,
                conversation_id,
                prompt,
            } => {
                // Enforce a single pending task even if an abort was missed
                if let Some(previous) = self.pending.take() {
                    tracing::warn!(request_id = %previous.request_id, "Replacing pending reply");
                    previous.cancel();
                }
                self.pending = Some(self.spawn_reply(request_id, conversation_id, prompt));
            }

            Effect::AbortReply { request_id } => {
                tracing::info!(request_id = %request_id, "Aborting reply");
                match self.pending.take() {
                    Some(pending) if pending.request_id == request_id => pending.cancel(),
                    Some(other) => self.pending = Some(other),
                    None => {}
                }
            }

            Effect::NotifyGenerationStarted {
                conversation_id, ..
            } => {
                self.notify(SessionEvent::GenerationStarted { conversation_id });
            }

            Effect::NotifyGenerationDone {
                request_id,
                conversation_id,
                outcome,
            } => {
                if self
                    .pending
                    .as_ref()
                    .is_some_and(|p| p.request_id == request_id)
                {
                    self.pending = None;
                }
                tracing::info!(request_id = %request_id, conv_id = %conversation_id, ?outcome, "Generation finished");
                self.notify(SessionEvent::GenerationDone {
                    conversation_id,
                    outcome,
                });
            }

            Effect::NotifyError { message } => {
                self.notify(SessionEvent::Error { message });
            }
        }
    }

    fn spawn_reply(
        &self,
        request_id: RequestId,
        conversation_id: String,
        prompt: String,
    ) -> PendingReply {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let responder = self.responder.clone();
        let event_tx = self.event_tx.clone();

        let handle = tokio::spawn(async move {
            tracing::info!(request_id = %request_id, conv_id = %conversation_id, "Requesting reply (background)");

            // A panic inside the responder ends the inner task with a
            // JoinError. Dropping the handle aborts the inner task.
            let generation = AbortOnDropHandle::new(tokio::spawn(async move {
                responder.generate(&prompt).await
            }));

            // Race the responder against cancellation
            tokio::select! {
                biased;

                () = token.cancelled() => {
                    tracing::info!(request_id = %request_id, "Reply cancelled");
                }

                joined = generation => {
                    let result = joined.unwrap_or_else(|e| Err(join_failure(request_id, &e)));
                    let event = match result {
                        Ok(message) => Event::ReplyReady {
                            request_id,
                            conversation_id,
                            message,
                        },
                        Err(error) => Event::ReplyFailed {
                            request_id,
                            conversation_id,
                            error,
                        },
                    };
                    let _ = event_tx.send(event).await;
                }
            }
        });

        PendingReply {
            request_id,
            cancel_token,
            handle,
        }
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }
}

fn join_failure(request_id: RequestId, error: &JoinError) -> ResponderError {
    if error.is_panic() {
        tracing::error!(request_id = %request_id, "Responder panicked");
        ResponderError::unknown("The responder crashed while generating a reply")
    } else {
        tracing::warn!(request_id = %request_id, "Reply task stopped before finishing");
        ResponderError::unknown("Reply generation was interrupted")
    }
}

impl<R> Drop for SessionRuntime<R>
where
    R: Responder + 'static,
{
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(request_id = %pending.request_id, "Session dropped, cancelling reply");
            pending.cancel();
        }
    }
}
