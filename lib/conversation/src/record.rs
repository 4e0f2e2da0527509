//! Conversation records and their handler-typed views.

use crate::error::ConversationError;
use crate::variant::HandlerVariant;
use chrono::{DateTime, Utc};
use parley_core::{ConversationId, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// The lifecycle state of a conversation.
///
/// Handler variants may add their own intermediate states.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConversationState {
    /// Freshly created.
    New,
    /// Terminal. No transition leaves this state.
    Finished,
    /// A variant-specific intermediate state.
    Custom(String),
}

impl ConversationState {
    /// Creates a variant-specific state.
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self::from(name)
    }

    /// Returns the stored name of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Finished => "finished",
            Self::Custom(name) => name,
        }
    }

    /// Returns true for the terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl From<String> for ConversationState {
    fn from(name: String) -> Self {
        match name.as_str() {
            "new" => Self::New,
            "finished" => Self::Finished,
            _ => Self::Custom(name),
        }
    }
}

impl From<ConversationState> for String {
    fn from(state: ConversationState) -> Self {
        match state {
            ConversationState::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored conversation with someone about a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Record identity, assigned by the store.
    pub id: ConversationId,
    /// The other party.
    pub with: String,
    /// What the conversation is about. Blank and absent are equivalent.
    pub topic: Option<String>,
    /// Lifecycle state.
    pub state: ConversationState,
    /// Set by the store on creation.
    pub created_at: DateTime<Utc>,
    /// Set by the store on every save.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Returns true once the conversation is finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Moves to `to`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when leaving `finished`.
    pub fn transition_to(&mut self, to: ConversationState) -> Result<(), ConversationError> {
        if self.is_finished() && !to.is_finished() {
            return Err(ConversationError::InvalidStateTransition {
                from: self.state.clone(),
                to,
            }
            .into());
        }
        self.state = to;
        Ok(())
    }

    /// Moves to `finished` from any state.
    pub fn finish(&mut self) {
        self.state = ConversationState::Finished;
    }
}

/// Fields for a conversation that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConversation {
    /// The other party.
    pub with: String,
    /// The requested topic.
    pub topic: Option<String>,
    /// Initial state, `new` unless a caller says otherwise.
    pub state: ConversationState,
}

impl NewConversation {
    /// Creates the fields for a new conversation.
    #[must_use]
    pub fn new(with: impl Into<String>, topic: Option<&str>) -> Self {
        Self {
            with: with.into(),
            topic: topic.map(str::to_string),
            state: ConversationState::New,
        }
    }
}

/// A conversation viewed as a particular handler variant.
///
/// The record is carried unchanged; only the label differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedConversation {
    variant: HandlerVariant,
    record: Conversation,
}

impl TypedConversation {
    /// Labels `record` as `variant`.
    #[must_use]
    pub fn new(variant: HandlerVariant, record: Conversation) -> Self {
        Self { variant, record }
    }

    /// The handler variant this view is typed as.
    #[must_use]
    pub fn variant(&self) -> &HandlerVariant {
        &self.variant
    }

    /// The underlying record.
    #[must_use]
    pub fn record(&self) -> &Conversation {
        &self.record
    }

    /// Mutable access to the underlying record.
    pub fn record_mut(&mut self) -> &mut Conversation {
        &mut self.record
    }

    /// Relabels the same record as another variant.
    #[must_use]
    pub fn becomes(self, variant: HandlerVariant) -> Self {
        Self {
            variant,
            record: self.record,
        }
    }

    /// Returns the underlying record.
    #[must_use]
    pub fn into_record(self) -> Conversation {
        self.record
    }
}

impl Deref for TypedConversation {
    type Target = Conversation;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}
