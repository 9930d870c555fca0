//! Provider-agnostic types for multi-provider inference

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InferError;

/// Provider-agnostic chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Per-request overrides. Absent fields fall back to the selected
/// adapter's configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceOptions {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// The transport-independent inbound request shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Selector naming the adapter that should serve this request
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(flatten)]
    pub options: InferenceOptions,
}

/// Uniform result returned by every adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Name of the adapter that served the request
    pub provider: String,
    /// The model actually used
    pub model: String,
    /// Produced text. Always a string, possibly empty.
    pub content: String,
    /// Opaque diagnostic mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// How adapters treat success payloads that don't match the shape
/// they expect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Degrade to an empty or best-effort string with a diagnostic
    /// in `details`
    #[default]
    Lenient,
    /// Fail with an upstream error
    Strict,
}

/// Trait every provider adapter implements
#[async_trait]
pub trait Provider: Send + Sync {
    /// Selector name (e.g. "openai", "anthropic")
    fn name(&self) -> &str;

    /// Model used when the request doesn't override it
    fn default_model(&self) -> &str;

    /// Whether the required credential is present
    fn is_configured(&self) -> bool;

    /// Perform exactly one outbound call and map the response into
    /// the normalized result shape
    async fn infer(
        &self,
        messages: &[ChatMessage],
        opts: &InferenceOptions,
    ) -> Result<InferenceResult, InferError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_role_display() {
        assert_eq!(ChatRole::System.to_string(), "system");
        assert_eq!(ChatRole::User.to_string(), "user");
        assert_eq!(ChatRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_chat_role_serde_lowercase() {
        let json = serde_json::to_string(&ChatRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let role: ChatRole = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(role, ChatRole::System);
    }

    #[test]
    fn test_request_deserializes_flat_options() {
        let request: InferenceRequest = serde_json::from_str(
            r#"{"messages":[{"role":"user","content":"hi"}],"provider":"openai","temperature":0.3}"#,
        )
        .unwrap();
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.provider.as_deref(), Some("openai"));
        assert_eq!(request.options.temperature, Some(0.3));
        assert_eq!(request.options.model, None);
    }

    #[test]
    fn test_request_defaults() {
        let request: InferenceRequest = serde_json::from_str("{}").unwrap();
        assert!(request.messages.is_empty());
        assert!(request.provider.is_none());
        assert_eq!(request.options, InferenceOptions::default());
    }

    #[test]
    fn test_result_omits_empty_details() {
        let result = InferenceResult {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            content: "hi".to_string(),
            details: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_parse_mode_default_lenient() {
        assert_eq!(ParseMode::default(), ParseMode::Lenient);
    }
}
