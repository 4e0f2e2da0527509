//! Persistence port for conversation records.
//!
//! The engine never stores anything itself. Implementations own
//! timestamps and any uniqueness constraint; a store that rejects a second
//! in-progress conversation with the same party returns
//! `ConversationError::DuplicateConversation`.

use crate::error::ConversationError;
use crate::record::{Conversation, NewConversation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::Result;

/// Trait for conversation storage.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Gets the most recently updated unfinished conversation with `with`
    /// that was updated after `since`.
    async fn find_recent(
        &self,
        with: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Conversation>, ConversationError>;

    /// Gets the most recently updated unfinished conversation with `with`.
    async fn find_in_progress(&self, with: &str) -> Result<Option<Conversation>, ConversationError>;

    /// Stores a new conversation, assigning identity and timestamps.
    async fn create(&self, fields: NewConversation) -> Result<Conversation, ConversationError>;

    /// Persists changes to an existing conversation.
    async fn save(&self, conversation: &Conversation) -> Result<(), ConversationError>;

    /// Deletes a conversation.
    async fn destroy(&self, conversation: &Conversation) -> Result<(), ConversationError>;
}
