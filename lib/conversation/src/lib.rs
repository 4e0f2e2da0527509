//! Topic-routed conversations for parley.
//!
//! This crate provides:
//!
//! - **Handler Registry**: resolves a topic to the handler variant that owns
//!   it, honouring exclusions and the blank/unknown topic fallbacks
//! - **Conversation Facade**: relabels stored records as their variant and
//!   finds or creates the active conversation with someone
//! - **Ports**: storage, notification and per-variant handler traits

pub mod config;
pub mod error;
pub mod exclusion;
pub mod facade;
pub mod notify;
pub mod record;
pub mod registry;
pub mod store;
pub mod topic;
pub mod variant;

#[cfg(test)]
mod testing;

pub use config::{ConversationConfig, RegistryConfig};
pub use error::{ConversationError, RegistryError};
pub use exclusion::ExclusionRule;
pub use facade::{ConversationFacade, ConversationHandler};
pub use notify::Notifier;
pub use record::{Conversation, ConversationState, NewConversation, TypedConversation};
pub use registry::{HandlerRegistry, ResolveOptions};
pub use store::ConversationStore;
pub use variant::{HandlerCatalog, HandlerVariant};
