//! OpenAI provider (chat completions API)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{InferError, classify_transport_error};

use super::types::{ChatMessage, InferenceOptions, InferenceResult, ParseMode, Provider};

const DEFAULT_TEMPERATURE: f32 = 0.7;

/// OpenAI provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    parse_mode: ParseMode,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("parse_mode", &self.parse_mode)
            .finish()
    }
}

impl OpenAiProvider {
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

    /// Extract the produced text from a chat-completions payload.
    ///
    /// Lenient mode degrades an unusable payload to an empty string
    /// with the raw payload kept in the diagnostic details; strict
    /// mode raises instead.
    fn from_openai_response(
        payload: Value,
        mode: ParseMode,
    ) -> Result<(String, Option<Value>), InferError> {
        let parsed: OpenAiApiResponse = match serde_json::from_value(payload.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                return super::unusable_payload(
                    "openai",
                    payload,
                    mode,
                    &format!("malformed response: {e}"),
                );
            }
        };

        match parsed.choices.into_iter().next().and_then(|c| c.message.content) {
            Some(content) => Ok((content, None)),
            None => super::unusable_payload("openai", payload, mode, "response had no usable choices"),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
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
            return Err(InferError::missing_credential("openai", "OPENAI_API_KEY"));
        }

        let model = opts.model.as_deref().unwrap_or(&self.model);
        let temperature = opts.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": self.max_tokens,
            "stream": false,
        });

        debug!(
            "OpenAI request: model={}, messages={}",
            model,
            messages.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error("openai", self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InferError::Upstream {
                provider: "openai".to_string(),
                status: Some(status.as_u16()),
                message: extract_error_message(&error_text),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| classify_transport_error("openai", self.timeout, e))?;

        let (content, details) = Self::from_openai_response(payload, self.parse_mode)?;

        Ok(InferenceResult {
            provider: "openai".to_string(),
            model: model.to_string(),
            content,
            details,
        })
    }
}

/// Pull `error.message` out of an OpenAI error body, falling back to
/// the raw text
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

// ── OpenAI wire types ──

#[derive(Debug, Clone, Deserialize)]
struct OpenAiApiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::ChatRole;

    fn provider(key: &str) -> OpenAiProvider {
        OpenAiProvider::new(
            key.to_string(),
            "gpt-4o-mini".to_string(),
            "https://api.openai.com/v1".to_string(),
            1000,
            Duration::from_secs(60),
            ParseMode::Lenient,
        )
    }

    #[test]
    fn test_from_openai_response_text() {
        let payload = serde_json::json!({
            "choices": [{ "message": { "content": "hi there" } }]
        });
        let (content, details) =
            OpenAiProvider::from_openai_response(payload, ParseMode::Lenient).unwrap();
        assert_eq!(content, "hi there");
        assert!(details.is_none());
    }

    #[test]
    fn test_from_openai_response_no_choices_lenient() {
        let payload = serde_json::json!({ "choices": [] });
        let (content, details) =
            OpenAiProvider::from_openai_response(payload, ParseMode::Lenient).unwrap();
        assert_eq!(content, "");
        assert!(details.is_some());
    }

    #[test]
    fn test_from_openai_response_no_choices_strict() {
        let payload = serde_json::json!({ "choices": [] });
        let err = OpenAiProvider::from_openai_response(payload, ParseMode::Strict).unwrap_err();
        assert_eq!(err.kind(), "upstream");
    }

    #[test]
    fn test_from_openai_response_malformed_strict() {
        let payload = serde_json::json!({ "choices": "not a list" });
        let err = OpenAiProvider::from_openai_response(payload, ParseMode::Strict).unwrap_err();
        assert_eq!(err.kind(), "upstream");
    }

    #[test]
    fn test_messages_serialize_unchanged() {
        // OpenAI takes the normalized message shape verbatim
        let msgs = vec![
            ChatMessage::system("be terse"),
            ChatMessage::user("hello"),
        ];
        let json = serde_json::to_value(&msgs).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "role": "system", "content": "be terse" },
                { "role": "user", "content": "hello" },
            ])
        );
        assert_eq!(msgs[1].role, ChatRole::User);
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error":{"message":"invalid model","type":"invalid_request_error"}}"#;
        assert_eq!(extract_error_message(body), "invalid model");
        assert_eq!(extract_error_message("plain text"), "plain text");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_call() {
        let p = provider("");
        assert!(!p.is_configured());
        let err = p
            .infer(&[ChatMessage::user("hi")], &InferenceOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn test_debug_hides_key() {
        let p = provider("sk-secret-key");
        let debug = format!("{:?}", p);
        assert!(!debug.contains("sk-secret-key"));
    }
}
