//! Core types shared by the parley crates.
//!
//! This crate provides the identifier types and the `Result` alias used
//! throughout the conversation engine.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConversationId, ParseIdError};
