//! switchboard-core - provider-agnostic AI inference routing
//!
//! This crate provides:
//! - A normalized chat data model shared by all providers
//! - Adapters for OpenAI, Anthropic, Hugging Face, and an internal
//!   core passthrough service, each translating the normalized
//!   contract into that provider's wire format
//! - An [`InferenceRouter`] that validates requests, picks one
//!   adapter, and surfaces a uniform result or a typed error

pub mod error;
pub mod providers;

// Re-export main types for convenience
pub use error::InferError;
pub use providers::router::{InferenceRouter, SelectorPolicy};
pub use providers::types::{
    ChatMessage, ChatRole, InferenceOptions, InferenceRequest, InferenceResult, ParseMode,
    Provider,
};
