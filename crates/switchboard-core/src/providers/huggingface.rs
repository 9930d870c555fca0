//! Hugging Face Inference API provider
//!
//! The text-generation endpoint has no native multi-turn chat format,
//! so the whole conversation is flattened into one `ROLE: content`
//! prompt. Responses arrive either as a list of generations or as a
//! single generation object; both shapes are accepted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{InferError, classify_transport_error};

use super::types::{ChatMessage, InferenceOptions, InferenceResult, ParseMode, Provider};

const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Hugging Face provider
pub struct HuggingFaceProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    parse_mode: ParseMode,
}

impl std::fmt::Debug for HuggingFaceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("parse_mode", &self.parse_mode)
            .finish()
    }
}

impl HuggingFaceProvider {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
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
            timeout,
            parse_mode,
        }
    }

    /// Flatten the conversation into one newline-joined prompt of
    /// `ROLE: content` lines
    fn flatten_prompt(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .map(|m| format!("{}: {}", m.role.to_string().to_uppercase(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Extract generated text from either response shape
    fn from_hf_response(
        payload: Value,
        mode: ParseMode,
    ) -> Result<(String, Option<Value>), InferError> {
        let generation = match serde_json::from_value::<HfResponse>(payload.clone()) {
            Ok(HfResponse::Batch(generations)) => generations.into_iter().next(),
            Ok(HfResponse::Single(generation)) => Some(generation),
            Err(_) => None,
        };

        let text = generation.and_then(|g| {
            g.generated_text
                .or_else(|| g.choices.into_iter().next().and_then(|c| c.text))
        });

        match text {
            Some(text) => Ok((text, None)),
            None => match mode {
                ParseMode::Strict => Err(InferError::Upstream {
                    provider: "huggingface".to_string(),
                    status: None,
                    message: "response had no generated text".to_string(),
                }),
                // Last resort: hand back the raw payload as text
                ParseMode::Lenient => Ok((
                    payload.to_string(),
                    Some(serde_json::json!({ "note": "response had no generated text" })),
                )),
            },
        }
    }
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
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
                "huggingface",
                "HUGGINGFACE_API_KEY",
            ));
        }

        let model = opts.model.as_deref().unwrap_or(&self.model);
        let temperature = opts.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        let prompt = Self::flatten_prompt(messages);
        let url = format!("{}/models/{}", self.base_url, model);

        let body = serde_json::json!({
            "inputs": prompt,
            "parameters": { "temperature": temperature },
        });

        debug!(
            "Hugging Face request: model={}, prompt_len={}",
            model,
            prompt.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error("huggingface", self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InferError::Upstream {
                provider: "huggingface".to_string(),
                status: Some(status.as_u16()),
                message: error_text,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| classify_transport_error("huggingface", self.timeout, e))?;

        let (content, details) = Self::from_hf_response(payload, self.parse_mode)?;

        Ok(InferenceResult {
            provider: "huggingface".to_string(),
            model: model.to_string(),
            content,
            details,
        })
    }
}

// ── Hugging Face wire types ──

/// The inference API returns `[{generated_text}]` for most models but
/// a bare object for some
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum HfResponse {
    Batch(Vec<HfGeneration>),
    Single(HfGeneration),
}

#[derive(Debug, Clone, Deserialize)]
struct HfGeneration {
    #[serde(default)]
    generated_text: Option<String>,
    #[serde(default)]
    choices: Vec<HfChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct HfChoice {
    #[serde(default)]
    text: Option<String>,
}
