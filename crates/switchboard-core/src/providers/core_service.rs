//! Passthrough adapter for the internal core service
//!
//! The core service speaks a JSON contract close to the normalized
//! one, so the adapter forwards the request mostly verbatim. It needs
//! no credential; a base URL is its whole configuration.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{InferError, classify_transport_error};

use super::types::{ChatMessage, InferenceOptions, InferenceResult, Provider};

/// Internal core service passthrough
#[derive(Debug)]
pub struct CoreServiceProvider {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl CoreServiceProvider {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url,
            model,
            timeout,
        }
    }
}

#[async_trait]
impl Provider for CoreServiceProvider {
    fn name(&self) -> &str {
        "core"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
    }

    async fn infer(
        &self,
        messages: &[ChatMessage],
        opts: &InferenceOptions,
    ) -> Result<InferenceResult, InferError> {
        if !self.is_configured() {
            return Err(InferError::Configuration {
                provider: "core".to_string(),
                message: "missing core service base URL".to_string(),
            });
        }

        let model = opts.model.as_deref().unwrap_or(&self.model);
        let url = format!("{}/infer", self.base_url);

        let body = serde_json::json!({
            "messages": messages,
            "model": model,
            "temperature": opts.temperature,
        });

        debug!("Core service request: messages={}", messages.len());

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error("core", self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InferError::Upstream {
                provider: "core".to_string(),
                status: Some(status.as_u16()),
                message: error_text,
            });
        }

        let payload: CoreResponse = response
            .json()
            .await
            .map_err(|e| classify_transport_error("core", self.timeout, e))?;

        Ok(InferenceResult {
            provider: "core".to_string(),
            model: payload.model.unwrap_or_else(|| model.to_string()),
            content: payload.content.unwrap_or_default(),
            details: payload.details,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CoreResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_base_url_fails_before_any_call() {
        let p = CoreServiceProvider::new(
            String::new(),
            "core-default".to_string(),
            Duration::from_secs(60),
        );
        assert!(!p.is_configured());
        let err = p
            .infer(&[ChatMessage::user("hi")], &InferenceOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn test_configured_with_base_url_only() {
        let p = CoreServiceProvider::new(
            "http://localhost:8080".to_string(),
            "core-default".to_string(),
            Duration::from_secs(60),
        );
        assert!(p.is_configured());
        assert_eq!(p.name(), "core");
    }

    #[test]
    fn test_core_response_tolerates_sparse_payload() {
        let payload: CoreResponse = serde_json::from_str("{}").unwrap();
        assert!(payload.content.is_none());
        assert!(payload.model.is_none());
    }
}
