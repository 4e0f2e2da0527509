//! Conversation facade.
//!
//! Bridges stored records and handler variants:
//! - `details` relabels a record as the variant its topic resolves to
//! - `find_or_create_with` continues the active conversation with someone
//!   or starts one typed by topic
//! - `say`, `advance`, `finish` and `move_along` drive a conversation

use crate::config::{ConversationConfig, default_recency_window_hours};
use crate::error::{ConversationError, RegistryError};
use crate::notify::Notifier;
use crate::record::{Conversation, NewConversation, TypedConversation};
use crate::registry::{HandlerRegistry, ResolveOptions};
use crate::store::ConversationStore;
use crate::topic::is_blank;
use crate::variant::HandlerVariant;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parley_core::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Topic-specific conversation logic.
///
/// Implementations do their own work first and then call
/// [`ConversationFacade::advance`] as their final step so finishing
/// keywords keep working.
#[async_trait]
pub trait ConversationHandler: Send + Sync {
    /// Moves the conversation along in response to `message`.
    async fn move_along(
        &self,
        conversations: &ConversationFacade,
        conversation: &mut TypedConversation,
        message: Option<&str>,
    ) -> Result<(), ConversationError>;
}

/// Entry point for finding, creating and driving conversations.
pub struct ConversationFacade {
    registry: Arc<HandlerRegistry>,
    store: Arc<dyn ConversationStore>,
    notifier: Option<Arc<dyn Notifier>>,
    handlers: HashMap<String, Arc<dyn ConversationHandler>>,
    recency_window: Duration,
    finishing_keywords: Vec<String>,
}

impl ConversationFacade {
    /// Creates a facade with a 24 hour recency window and no finishing
    /// keywords.
    #[must_use]
    pub fn new(registry: Arc<HandlerRegistry>, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            registry,
            store,
            notifier: None,
            handlers: HashMap::new(),
            recency_window: Duration::hours(default_recency_window_hours()),
            finishing_keywords: Vec::new(),
        }
    }

    /// Creates a facade and applies `config` to it and to the registry.
    ///
    /// The registry's fallbacks, suffix and exclusion are replaced by the
    /// configured ones; anything the configuration leaves out is cleared.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the recency window or the registry
    /// settings are invalid.
    pub fn from_config(
        registry: Arc<HandlerRegistry>,
        store: Arc<dyn ConversationStore>,
        config: &ConversationConfig,
    ) -> Result<Self, RegistryError> {
        let recency_window = config.recency_window()?;
        registry.apply_config(&config.registry)?;
        Ok(Self::new(registry, store)
            .with_recency_window(recency_window)
            .with_finishing_keywords(config.finishing_keywords.clone()))
    }

    /// Registers the notifier used by `say`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Registers the logic for one handler variant.
    #[must_use]
    pub fn with_handler(
        mut self,
        variant: &HandlerVariant,
        handler: Arc<dyn ConversationHandler>,
    ) -> Self {
        self.handlers.insert(variant.name().to_string(), handler);
        self
    }

    /// Sets how long after its last update a conversation stays active.
    ///
    /// A window reaching back past the earliest representable time covers
    /// every unfinished conversation.
    #[must_use]
    pub fn with_recency_window(mut self, window: Duration) -> Self {
        self.recency_window = window;
        self
    }

    /// Sets the messages that finish a conversation.
    #[must_use]
    pub fn with_finishing_keywords(
        mut self,
        keywords: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.finishing_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// The registry used for resolution.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Returns true if `message` exactly matches a finishing keyword.
    #[must_use]
    pub fn is_finishing_keyword(&self, message: Option<&str>) -> bool {
        message.is_some_and(|message| self.finishing_keywords.iter().any(|k| k == message))
    }

    /// Views `record` as the variant its topic resolves to.
    ///
    /// Every field, identity included, is carried over unchanged. Returns
    /// `None` if the topic resolves to no variant.
    #[must_use]
    pub fn details(
        &self,
        record: Conversation,
        options: ResolveOptions,
    ) -> Option<TypedConversation> {
        self.registry
            .resolve(record.topic.as_deref(), options)
            .map(|variant| TypedConversation::new(variant, record))
    }

    /// Continues the active conversation with `with`, or starts a new one
    /// about `topic`.
    ///
    /// A conversation is active when it is unfinished and was updated
    /// within the recency window. An active conversation is returned as its
    /// own topic's variant, excluded or not, and `topic` is ignored.
    /// Otherwise `topic` is resolved and a new record of that variant is
    /// created.
    ///
    /// The lookup and the creation are separate store calls. Two callers
    /// racing here can both create, unless the store enforces uniqueness
    /// and fails one of them with `DuplicateConversation`.
    ///
    /// # Errors
    ///
    /// - `MissingParticipant` if `with` is empty.
    /// - `MissingBlankHandler` if the topic is blank and no blank-topic
    ///   variant is configured.
    /// - `UnresolvedTopic` if the topic has no variant, or its variant is
    ///   excluded, and no unknown-topic variant is configured.
    /// - Store errors, unchanged.
    #[instrument(skip(self))]
    pub async fn find_or_create_with(
        &self,
        with: &str,
        topic: Option<&str>,
    ) -> Result<TypedConversation, ConversationError> {
        if with.trim().is_empty() {
            return Err(ConversationError::MissingParticipant.into());
        }

        let since = Utc::now()
            .checked_sub_signed(self.recency_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        if let Some(existing) = self.store.find_recent(with, since).await? {
            let existing_topic = existing.topic.clone();
            return match self.details(existing, ResolveOptions::including_excluded()) {
                Some(conversation) => {
                    debug!(
                        conversation = %conversation.id,
                        variant = %conversation.variant(),
                        "continuing active conversation"
                    );
                    Ok(conversation)
                }
                None => Err(self.unresolved(existing_topic.as_deref()).into()),
            };
        }

        let Some(variant) = self.registry.resolve(topic, ResolveOptions::default()) else {
            return Err(self.unresolved(topic).into());
        };

        let record = self.store.create(NewConversation::new(with, topic)).await?;
        info!(conversation = %record.id, variant = %variant, "started conversation");
        Ok(TypedConversation::new(variant, record))
    }

    fn unresolved(&self, topic: Option<&str>) -> ConversationError {
        let base = self.registry.base().to_string();
        let error = match topic.filter(|_| !is_blank(topic)) {
            None => ConversationError::MissingBlankHandler { base },
            Some(topic) => {
                let excluded = self
                    .registry
                    .resolve(
                        Some(topic),
                        ResolveOptions {
                            include_excluded: true,
                            exclude_fallbacks: true,
                        },
                    )
                    .is_some();
                ConversationError::UnresolvedTopic {
                    key: self.registry.derive_key(topic),
                    base,
                    excluded,
                }
            }
        };
        warn!(%error, "could not resolve a handler");
        error
    }

    /// Gets the latest unfinished conversation with `with`, however old.
    ///
    /// # Errors
    ///
    /// Returns store errors unchanged.
    #[instrument(skip(self))]
    pub async fn find_in_progress(
        &self,
        with: &str,
    ) -> Result<Option<TypedConversation>, ConversationError> {
        Ok(self
            .store
            .find_in_progress(with)
            .await?
            .and_then(|record| self.details(record, ResolveOptions::including_excluded())))
    }

    /// Sends `message` to the other party.
    ///
    /// # Errors
    ///
    /// Returns `NotifierMissing` if no notifier is registered, or the
    /// notifier's error.
    #[instrument(skip(self, conversation), fields(with = %conversation.with))]
    pub async fn say(
        &self,
        conversation: &Conversation,
        message: &str,
    ) -> Result<(), ConversationError> {
        let Some(notifier) = &self.notifier else {
            return Err(ConversationError::NotifierMissing {
                with: conversation.with.clone(),
            }
            .into());
        };
        notifier.send(&conversation.with, message).await
    }

    /// Default handling of an incoming message: finishes the conversation
    /// if `message` is a finishing keyword, then saves it.
    ///
    /// # Errors
    ///
    /// Returns store errors unchanged.
    #[instrument(skip(self, conversation), fields(conversation = %conversation.id))]
    pub async fn advance(
        &self,
        conversation: &mut TypedConversation,
        message: Option<&str>,
    ) -> Result<(), ConversationError> {
        if self.is_finishing_keyword(message) {
            debug!("finishing keyword received");
            conversation.record_mut().finish();
        }
        self.store.save(conversation.record()).await
    }

    /// Finishes the conversation and saves it.
    ///
    /// # Errors
    ///
    /// Returns store errors unchanged.
    #[instrument(skip(self, conversation), fields(conversation = %conversation.id))]
    pub async fn finish(&self, conversation: &mut TypedConversation) -> Result<(), ConversationError> {
        conversation.record_mut().finish();
        self.store.save(conversation.record()).await
    }

    /// Runs the registered handler for the conversation's variant, or
    /// [`advance`](Self::advance) if the variant has none.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler or the store returns.
    pub async fn move_along(
        &self,
        conversation: &mut TypedConversation,
        message: Option<&str>,
    ) -> Result<(), ConversationError> {
        match self.handlers.get(conversation.variant().name()).cloned() {
            Some(handler) => handler.move_along(self, conversation, message).await,
            None => self.advance(conversation, message).await,
        }
    }

    /// Deletes the conversation from the store.
    ///
    /// # Errors
    ///
    /// Returns store errors unchanged.
    pub async fn destroy(&self, conversation: TypedConversation) -> Result<(), ConversationError> {
        self.store.destroy(conversation.record()).await
    }
}
