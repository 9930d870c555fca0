//! Anthropic Claude provider (messages API)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{InferError, classify_transport_error};

use super::types::{ChatMessage, ChatRole, InferenceOptions, InferenceResult, ParseMode, Provider};

const DEFAULT_TEMPERATURE: f32 = 0.2;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    parse_mode: ParseMode,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("parse_mode", &self.parse_mode)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        max_tokens: u32,
        timeout: Duration,
        parse_mode: ParseMode,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url,
            model,
            max_tokens,
            timeout,
            parse_mode,
        }
    }

    /// Split the normalized conversation into Anthropic's shape:
    /// system messages move to the top-level `system` field, the rest
    /// become `{role, content: [{type: "text", text}]}` entries.
    fn to_anthropic_messages(messages: &[ChatMessage]) -> (String, Vec<AnthropicMessage>) {
        let system = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let converted = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| AnthropicMessage {
                role: m.role.to_string(),
                content: vec![AnthropicBlock::Text {
                    text: m.content.clone(),
                }],
            })
            .collect();

        (system, converted)
    }

    /// Extract the first text block from a messages-API payload
    fn from_anthropic_response(
        payload: Value,
        mode: ParseMode,
    ) -> Result<(String, Option<Value>), InferError> {
        let parsed: AnthropicApiResponse = match serde_json::from_value(payload.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                return super::unusable_payload(
                    "anthropic",
                    payload,
                    mode,
                    &format!("malformed response: {e}"),
                );
            }
        };

        let text = parsed
            .content
            .into_iter()
            .find(|b| b.kind == "text")
            .and_then(|b| b.text);

        match text {
            Some(text) => Ok((text, None)),
            None => super::unusable_payload("anthropic", payload, mode, "response had no text block"),
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn infer(
        &self,
        messages: &[ChatMessage],
        opts: &InferenceOptions,
    ) -> Result<InferenceResult, InferError> {
        if !self.is_configured() {
            return Err(InferError::missing_credential(
                "anthropic",
                "ANTHROPIC_API_KEY",
            ));
        }

        let (system, anthropic_messages) = Self::to_anthropic_messages(messages);

        // Anthropic rejects an empty messages array, so a
        // conversation of only system entries is a caller error.
        if anthropic_messages.is_empty() {
            return Err(InferError::Validation(
                "anthropic requires at least one non-system message".to_string(),
            ));
        }

        let model = opts.model.as_deref().unwrap_or(&self.model);
        let temperature = opts.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        let url = format!("{}/messages", self.base_url);

        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": self.max_tokens,
            "messages": anthropic_messages,
            "temperature": temperature,
        });
        if !system.is_empty() {
            body["system"] = Value::String(system);
        }

        debug!(
            "Anthropic request: model={}, messages={}",
            model,
            anthropic_messages.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error("anthropic", self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InferError::Upstream {
                provider: "anthropic".to_string(),
                status: Some(status.as_u16()),
                message: error_text,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| classify_transport_error("anthropic", self.timeout, e))?;

        let (content, details) = Self::from_anthropic_response(payload, self.parse_mode)?;

        Ok(InferenceResult {
            provider: "anthropic".to_string(),
            model: model.to_string(),
            content,
            details,
        })
    }
}

// ── Anthropic wire types ──

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock {
    Text { text: String },
}

/// Response blocks are decoded permissively: unknown block types are
/// kept but carry no text
#[derive(Debug, Clone, Deserialize)]
struct AnthropicApiResponse {
    #[serde(default)]
    content: Vec<AnthropicRespBlock>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicRespBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(key: &str, mode: ParseMode) -> AnthropicProvider {
        AnthropicProvider::new(
            key.to_string(),
            "claude-3-haiku-20240307".to_string(),
            "https://api.anthropic.com/v1".to_string(),
            1024,
            Duration::from_secs(60),
            mode,
        )
    }

    #[test]
    fn test_system_extracted_separately() {
        let msgs = vec![
            ChatMessage::system("be terse"),
            ChatMessage::user("2+2?"),
        ];
        let (system, converted) = AnthropicProvider::to_anthropic_messages(&msgs);
        assert_eq!(system, "be terse");
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].role, "user");
    }

    #[test]
    fn test_multiple_system_messages_joined() {
        let msgs = vec![
            ChatMessage::system("first"),
            ChatMessage::system("second"),
            ChatMessage::user("hi"),
        ];
        let (system, converted) = AnthropicProvider::to_anthropic_messages(&msgs);
        assert_eq!(system, "first\nsecond");
        assert_eq!(converted.len(), 1);
    }

    #[test]
    fn test_message_serializes_as_text_blocks() {
        let msgs = vec![ChatMessage::user("hello")];
        let (_, converted) = AnthropicProvider::to_anthropic_messages(&msgs);
        let json = serde_json::to_value(&converted).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "role": "user", "content": [{ "type": "text", "text": "hello" }] }
            ])
        );
    }

    #[test]
    fn test_from_anthropic_response_text() {
        let payload = serde_json::json!({
            "content": [{ "type": "text", "text": "4" }]
        });
        let (content, details) =
            AnthropicProvider::from_anthropic_response(payload, ParseMode::Lenient).unwrap();
        assert_eq!(content, "4");
        assert!(details.is_none());
    }

    #[test]
    fn test_from_anthropic_response_skips_non_text_blocks() {
        let payload = serde_json::json!({
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "text", "text": "answer" },
            ]
        });
        let (content, _) =
            AnthropicProvider::from_anthropic_response(payload, ParseMode::Lenient).unwrap();
        assert_eq!(content, "answer");
    }

    #[test]
    fn test_from_anthropic_response_no_text_lenient() {
        let payload = serde_json::json!({ "content": [] });
        let (content, details) =
            AnthropicProvider::from_anthropic_response(payload, ParseMode::Lenient).unwrap();
        assert_eq!(content, "");
        assert!(details.is_some());
    }

    #[test]
    fn test_from_anthropic_response_no_text_strict() {
        let payload = serde_json::json!({ "content": [] });
        let err =
            AnthropicProvider::from_anthropic_response(payload, ParseMode::Strict).unwrap_err();
        assert_eq!(err.kind(), "upstream");
    }

    #[tokio::test]
    async fn test_only_system_messages_rejected() {
        let p = provider("sk-ant-key", ParseMode::Lenient);
        let err = p
            .infer(&[ChatMessage::system("be terse")], &InferenceOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_call() {
        let p = provider("", ParseMode::Lenient);
        let err = p
            .infer(&[ChatMessage::user("hi")], &InferenceOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn test_debug_hides_key() {
        let p = provider("sk-ant-secret", ParseMode::Lenient);
        assert!(!format!("{:?}", p).contains("sk-ant-secret"));
    }
}
