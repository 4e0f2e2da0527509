//! Error types for the conversation crate.
//!
//! Errors are returned wrapped in a rootcause `Report`:
//! - `RegistryError`: configuring the handler registry
//! - `ConversationError`: finding, creating and advancing conversations

use crate::record::ConversationState;
use std::fmt;

/// Errors from handler registry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The configuration has an unsupported shape or value.
    InvalidConfiguration { reason: String },
    /// A variant already owns this topic key.
    DuplicateVariant { name: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid handler configuration: {reason}")
            }
            Self::DuplicateVariant { name } => {
                write!(f, "a handler variant named {name} is already registered")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors from conversation operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// A non-blank topic has no handler variant and no unknown-topic fallback.
    UnresolvedTopic {
        /// The derived topic key.
        key: String,
        /// The base conversation type name.
        base: String,
        /// Whether the key names a registered variant that is excluded.
        excluded: bool,
    },
    /// A blank topic with no blank-topic fallback configured.
    MissingBlankHandler { base: String },
    /// The store refused to create a second in-progress conversation.
    DuplicateConversation { with: String },
    /// The other party of a conversation was empty.
    MissingParticipant,
    /// A state change not allowed by the conversation lifecycle.
    InvalidStateTransition {
        from: ConversationState,
        to: ConversationState,
    },
    /// `say` was called before a notifier was registered.
    NotifierMissing { with: String },
    /// Storage operation failed.
    StorageFailed { reason: String },
    /// Delivering a notification failed.
    NotificationFailed { reason: String },
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedTopic {
                key,
                base,
                excluded: true,
            } => write!(
                f,
                "{key} has been excluded from {base} resolution and no unknown-topic handler is configured"
            ),
            Self::UnresolvedTopic {
                key,
                base,
                excluded: false,
            } => write!(
                f,
                "{key} is not defined as a {base} handler and no unknown-topic handler is configured"
            ),
            Self::MissingBlankHandler { base } => {
                write!(f, "no blank-topic handler configured for {base}")
            }
            Self::DuplicateConversation { with } => {
                write!(f, "an in-progress conversation with {with} already exists")
            }
            Self::MissingParticipant => write!(f, "a conversation needs someone to talk with"),
            Self::InvalidStateTransition { from, to } => {
                write!(f, "invalid state transition from {from} to {to}")
            }
            Self::NotifierMissing { with } => {
                write!(f, "no notifier registered to reach {with}")
            }
            Self::StorageFailed { reason } => {
                write!(f, "conversation storage failed: {reason}")
            }
            Self::NotificationFailed { reason } => {
                write!(f, "notification failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ConversationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_topic_says_whether_excluded() {
        let undefined = ConversationError::UnresolvedTopic {
            key: "CheeseConversation".to_string(),
            base: "Conversation".to_string(),
            excluded: false,
        };
        let excluded = ConversationError::UnresolvedTopic {
            key: "HelloConversation".to_string(),
            base: "Conversation".to_string(),
            excluded: true,
        };

        assert!(undefined.to_string().contains("CheeseConversation is not defined"));
        assert!(excluded.to_string().contains("HelloConversation has been excluded"));
    }

    #[test]
    fn missing_blank_handler_display() {
        let err = ConversationError::MissingBlankHandler {
            base: "Conversation".to_string(),
        };
        assert!(err.to_string().contains("no blank-topic handler configured"));
    }

    #[test]
    fn transition_error_names_states() {
        let err = ConversationError::InvalidStateTransition {
            from: ConversationState::Finished,
            to: ConversationState::New,
        };
        assert_eq!(
            err.to_string(),
            "invalid state transition from finished to new"
        );
    }
}
