//! In-memory conversation store
//!
//! Holds every conversation of the session, most recent first, plus the
//! active-conversation pointer.

use crate::error::SessionError;
use crate::model::{Conversation, Message};
use chrono::Utc;

/// Store for all conversations of a session
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active_conversation_id: Option<String>,
    /// Last millisecond stamp handed out as an id
    last_id_stamp: i64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty conversation at the front of the list and make it active
    pub fn create_conversation(&mut self) -> String {
        let id = self.next_id();
        self.conversations.insert(0, Conversation::new(&id));
        self.active_conversation_id = Some(id.clone());
        tracing::debug!(conv_id = %id, count = self.conversations.len(), "Created conversation");
        id
    }

    /// Make `id` the active conversation. Unknown ids leave the selection unchanged.
    pub fn select_conversation(&mut self, id: &str) -> Result<(), SessionError> {
        if !self.contains(id) {
            return Err(SessionError::UnknownConversation(id.to_string()));
        }
        self.active_conversation_id = Some(id.to_string());
        Ok(())
    }

    /// Append a message to the conversation with the given id
    pub fn append_message(&mut self, id: &str, message: Message) -> Result<(), SessionError> {
        let conv = self
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownConversation(id.to_string()))?;
        conv.push(message);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// All conversations, most recently created first
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_conversation_id.as_deref()
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.active_id().and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Timestamp-based id, strictly increasing even when two conversations
    /// are created within the same millisecond
    fn next_id(&mut self) -> String {
        let stamp = Utc::now().timestamp_millis().max(self.last_id_stamp + 1);
        self.last_id_stamp = stamp;
        format!("convo-{stamp}")
    }
}
