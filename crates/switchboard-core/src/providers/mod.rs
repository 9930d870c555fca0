//! Multi-provider inference abstraction layer
//!
//! Supports OpenAI, Anthropic, Hugging Face, and an internal core
//! passthrough service. Adapters implement the [`Provider`] trait
//! and are composed behind an [`InferenceRouter`] that validates
//! requests and picks exactly one adapter per call.

pub mod anthropic;
pub mod core_service;
pub mod huggingface;
pub mod openai;
pub mod router;
pub mod types;

pub use router::{InferenceRouter, SelectorPolicy};
pub use types::{ChatMessage, InferenceOptions, InferenceRequest, InferenceResult, Provider};

use serde_json::Value;

use crate::error::InferError;
use types::ParseMode;

/// Shared degradation path for a success payload an adapter cannot
/// turn into usable text: strict mode raises, lenient mode hands
/// back an empty string with the raw payload kept in the details.
pub(crate) fn unusable_payload(
    provider: &str,
    payload: Value,
    mode: ParseMode,
    message: &str,
) -> Result<(String, Option<Value>), InferError> {
    match mode {
        ParseMode::Strict => Err(InferError::Upstream {
            provider: provider.to_string(),
            status: None,
            message: message.to_string(),
        }),
        ParseMode::Lenient => Ok((
            String::new(),
            Some(serde_json::json!({ "note": message, "raw": payload })),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unusable_payload_lenient_degrades() {
        let payload = serde_json::json!({ "odd": true });
        let (content, details) =
            unusable_payload("openai", payload.clone(), ParseMode::Lenient, "no choices")
                .unwrap();
        assert_eq!(content, "");
        let details = details.unwrap();
        assert_eq!(details["note"], "no choices");
        assert_eq!(details["raw"], payload);
    }

    #[test]
    fn test_unusable_payload_strict_raises() {
        let payload = serde_json::json!({ "odd": true });
        let err = unusable_payload("anthropic", payload, ParseMode::Strict, "no text block")
            .unwrap_err();
        assert_eq!(err.kind(), "upstream");
        assert!(err.to_string().contains("anthropic"));
        assert!(err.to_string().contains("no text block"));
    }
}
