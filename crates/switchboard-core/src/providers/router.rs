//! Inference router — validates a request and dispatches it to
//! exactly one provider adapter

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::InferError;

use super::types::{InferenceRequest, InferenceResult, Provider};

/// What to do with a selector that names no known adapter.
///
/// Source deployments disagreed here, so the choice is explicit
/// configuration rather than policy baked into the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorPolicy {
    /// Route to the default adapter (logged at warn)
    #[default]
    Fallback,
    /// Fail the request as invalid input
    Reject,
}

/// Per-adapter snapshot for health and status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub name: String,
    pub model: String,
    pub configured: bool,
}

/// Routes inference requests to one of several provider adapters.
///
/// Built once at startup and shared across concurrent requests;
/// adapters are read-only after construction, so no locking is
/// needed.
pub struct InferenceRouter {
    providers: Vec<Box<dyn Provider>>,
    default_provider: String,
    policy: SelectorPolicy,
}

impl std::fmt::Debug for InferenceRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceRouter")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("default_provider", &self.default_provider)
            .field("policy", &self.policy)
            .finish()
    }
}

impl InferenceRouter {
    /// Create a router over pre-constructed adapters.
    ///
    /// Fails if `default_provider` names none of them.
    pub fn new(
        providers: Vec<Box<dyn Provider>>,
        default_provider: impl Into<String>,
    ) -> Result<Self, InferError> {
        let default_provider = default_provider.into();
        if !providers.iter().any(|p| p.name() == default_provider) {
            return Err(InferError::Configuration {
                provider: default_provider,
                message: "default provider is not among the registered adapters".to_string(),
            });
        }
        Ok(Self {
            providers,
            default_provider,
            policy: SelectorPolicy::default(),
        })
    }

    /// Set the unknown-selector policy
    pub fn with_policy(mut self, policy: SelectorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Name of the default adapter
    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    /// Per-adapter status snapshots, in registration order
    pub fn providers(&self) -> Vec<ProviderStatus> {
        self.providers
            .iter()
            .map(|p| ProviderStatus {
                name: p.name().to_string(),
                model: p.default_model().to_string(),
                configured: p.is_configured(),
            })
            .collect()
    }

    /// Validate the request, pick one adapter, and dispatch.
    ///
    /// No retries: these are interactive single-shot calls, and
    /// silently duplicating an inference call is worse than failing.
    pub async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResult, InferError> {
        self.validate(request)?;
        let provider = self.select(request.provider.as_deref())?;

        // Credential check happens here so misconfiguration never
        // costs an outbound round trip.
        if !provider.is_configured() {
            return Err(InferError::Configuration {
                provider: provider.name().to_string(),
                message: "required credential is missing".to_string(),
            });
        }

        debug!(
            "Dispatching {} message(s) to provider {}",
            request.messages.len(),
            provider.name()
        );

        provider.infer(&request.messages, &request.options).await
    }

    fn validate(&self, request: &InferenceRequest) -> Result<(), InferError> {
        if request.messages.is_empty() {
            return Err(InferError::Validation(
                "messages must be a non-empty list".to_string(),
            ));
        }
        if request.messages.iter().any(|m| m.content.trim().is_empty()) {
            return Err(InferError::Validation(
                "message content must not be empty".to_string(),
            ));
        }
        if let Some(t) = request.options.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(InferError::Validation(format!(
                    "temperature must be within [0, 2], got {t}"
                )));
            }
        }
        Ok(())
    }

    fn select(&self, selector: Option<&str>) -> Result<&dyn Provider, InferError> {
        let Some(selector) = selector else {
            return Ok(self.get(&self.default_provider));
        };

        // `internal` is the legacy alias for the core passthrough
        let canonical = match selector {
            "internal" => "core",
            other => other,
        };

        if self.providers.iter().any(|p| p.name() == canonical) {
            return Ok(self.get(canonical));
        }

        match self.policy {
            SelectorPolicy::Fallback => {
                warn!(
                    "Unknown provider selector '{}', falling back to '{}'",
                    selector, self.default_provider
                );
                Ok(self.get(&self.default_provider))
            }
            SelectorPolicy::Reject => Err(InferError::Validation(format!(
                "unknown provider '{selector}'"
            ))),
        }
    }

    fn get(&self, name: &str) -> &dyn Provider {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
            .expect("provider names are checked at construction")
    }
}
