//! Outbound notification port.

use crate::error::ConversationError;
use async_trait::async_trait;
use parley_core::Result;

/// Delivers a message to the other party of a conversation.
///
/// Transport (SMS, email, chat) is up to the implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `message` to `with`.
    async fn send(&self, with: &str, message: &str) -> Result<(), ConversationError>;
}
