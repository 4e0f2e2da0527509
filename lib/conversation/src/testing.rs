//! In-memory doubles for the store and notifier ports.

use crate::error::ConversationError;
use crate::notify::Notifier;
use crate::record::{Conversation, ConversationState, NewConversation};
use crate::store::ConversationStore;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parley_core::{ConversationId, Result};
use std::sync::{Arc, Mutex, Once};

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An unfinished record last updated `age` ago.
pub fn stored(with: &str, topic: Option<&str>, age: Duration) -> Conversation {
    let updated_at = Utc::now() - age;
    Conversation {
        id: ConversationId::new(),
        with: with.to_string(),
        topic: topic.map(str::to_string),
        state: ConversationState::New,
        created_at: updated_at,
        updated_at,
    }
}

/// In-memory conversation store for testing.
#[derive(Default)]
pub struct InMemoryConversationStore {
    records: Arc<Mutex<Vec<Conversation>>>,
    unique_in_progress: bool,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects creating a second unfinished conversation with the same party.
    pub fn with_unique_in_progress(mut self) -> Self {
        self.unique_in_progress = true;
        self
    }

    /// Seeds a record as is, timestamps included.
    pub fn insert(&self, record: Conversation) -> Conversation {
        self.records.lock().unwrap().push(record.clone());
        record
    }

    pub fn all(&self) -> Vec<Conversation> {
        self.records.lock().unwrap().clone()
    }

    fn latest(&self, filter: impl Fn(&Conversation) -> bool) -> Option<Conversation> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| filter(record))
            .max_by_key(|record| record.updated_at)
            .cloned()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn find_recent(
        &self,
        with: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Conversation>, ConversationError> {
        Ok(self.latest(|r| r.with == with && !r.is_finished() && r.updated_at > since))
    }

    async fn find_in_progress(&self, with: &str) -> Result<Option<Conversation>, ConversationError> {
        Ok(self.latest(|r| r.with == with && !r.is_finished()))
    }

    async fn create(&self, fields: NewConversation) -> Result<Conversation, ConversationError> {
        let mut records = self.records.lock().unwrap();
        if self.unique_in_progress
            && records
                .iter()
                .any(|r| r.with == fields.with && !r.is_finished())
        {
            return Err(ConversationError::DuplicateConversation { with: fields.with }.into());
        }

        let now = Utc::now();
        let record = Conversation {
            id: ConversationId::new(),
            with: fields.with,
            topic: fields.topic,
            state: fields.state,
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), ConversationError> {
        let mut records = self.records.lock().unwrap();
        let Some(slot) = records.iter_mut().find(|r| r.id == conversation.id) else {
            return Err(ConversationError::StorageFailed {
                reason: format!("{} is not stored", conversation.id),
            }
            .into());
        };
        *slot = Conversation {
            updated_at: Utc::now(),
            ..conversation.clone()
        };
        Ok(())
    }

    async fn destroy(&self, conversation: &Conversation) -> Result<(), ConversationError> {
        self.records
            .lock()
            .unwrap()
            .retain(|r| r.id != conversation.id);
        Ok(())
    }
}

/// Notifier that records every message it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, with: &str, message: &str) -> Result<(), ConversationError> {
        self.sent
            .lock()
            .unwrap()
            .push((with.to_string(), message.to_string()));
        Ok(())
    }
}
