//! Error taxonomy for the inference router
//!
//! Every failure that crosses the crate boundary is one of these
//! variants. The gateway maps each variant to an HTTP status; the
//! `kind` string is what callers branch on in error bodies.

use std::time::Duration;

use thiserror::Error;

/// Typed failure from the router or one of its adapters
#[derive(Debug, Error)]
pub enum InferError {
    /// Malformed or absent input. The caller's fault, never retried.
    #[error("{0}")]
    Validation(String),

    /// Required credential missing for the selected provider.
    /// Detected before any outbound call is made.
    #[error("provider {provider} is not configured: {message}")]
    Configuration { provider: String, message: String },

    /// The provider was reachable but responded with a failure or a
    /// payload the adapter could not use.
    #[error("{provider} request failed{}: {message}", .status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    Upstream {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// The outbound call exceeded its configured bound.
    #[error("{provider} request timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

impl InferError {
    /// Stable machine-readable kind string for error response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Configuration { .. } => "configuration",
            Self::Upstream { .. } => "upstream",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// HTTP status code the gateway should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Configuration { .. } => 500,
            Self::Upstream { .. } => 502,
            Self::Timeout { .. } => 504,
        }
    }

    /// Missing-credential error for a provider
    pub fn missing_credential(provider: &str, what: &str) -> Self {
        Self::Configuration {
            provider: provider.to_string(),
            message: format!("missing {what}"),
        }
    }
}

/// Classify a `reqwest` transport failure for one provider call.
///
/// Timeouts get their own variant so the gateway can answer 504;
/// everything else (DNS, refused connection, TLS) is an upstream
/// failure from the caller's point of view.
pub fn classify_transport_error(provider: &str, timeout: Duration, err: reqwest::Error) -> InferError {
    classify_transport(
        provider,
        timeout,
        err.is_timeout(),
        err.status().map(|s| s.as_u16()),
        err.to_string(),
    )
}

fn classify_transport(
    provider: &str,
    timeout: Duration,
    timed_out: bool,
    status: Option<u16>,
    message: String,
) -> InferError {
    if timed_out {
        InferError::Timeout {
            provider: provider.to_string(),
            timeout,
        }
    } else {
        InferError::Upstream {
            provider: provider.to_string(),
            status,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(InferError::Validation("x".into()).kind(), "validation");
        assert_eq!(
            InferError::missing_credential("openai", "OPENAI_API_KEY").kind(),
            "configuration"
        );
        assert_eq!(
            InferError::Upstream {
                provider: "openai".into(),
                status: Some(500),
                message: "boom".into(),
            }
            .kind(),
            "upstream"
        );
        assert_eq!(
            InferError::Timeout {
                provider: "openai".into(),
                timeout: Duration::from_secs(60),
            }
            .kind(),
            "timeout"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(InferError::Validation("x".into()).status_code(), 400);
        assert_eq!(
            InferError::missing_credential("hf", "token").status_code(),
            500
        );
        assert_eq!(
            InferError::Upstream {
                provider: "hf".into(),
                status: None,
                message: "unreachable".into(),
            }
            .status_code(),
            502
        );
        assert_eq!(
            InferError::Timeout {
                provider: "hf".into(),
                timeout: Duration::from_secs(1),
            }
            .status_code(),
            504
        );
    }

    #[test]
    fn test_upstream_display_includes_status() {
        let err = InferError::Upstream {
            provider: "anthropic".into(),
            status: Some(429),
            message: "rate limited".into(),
        };
        let text = err.to_string();
        assert!(text.contains("anthropic"));
        assert!(text.contains("429"));
        assert!(text.contains("rate limited"));
    }

    #[test]
    fn test_classify_transport_timeout() {
        let err = classify_transport(
            "openai",
            Duration::from_secs(60),
            true,
            None,
            "operation timed out".to_string(),
        );
        assert_eq!(err.kind(), "timeout");
        assert_eq!(err.status_code(), 504);
    }

    #[test]
    fn test_classify_transport_other_failures_are_upstream() {
        let err = classify_transport(
            "huggingface",
            Duration::from_secs(60),
            false,
            Some(503),
            "service unavailable".to_string(),
        );
        assert_eq!(err.kind(), "upstream");
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn test_slow_upstream_classified_as_timeout() {
        // A listener that never answers; the client timeout must
        // surface as the timeout variant, not a generic upstream one.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let timeout = Duration::from_millis(100);
        let client = reqwest::Client::builder().timeout(timeout).build().unwrap();
        let err = client
            .post(format!("http://{addr}/infer"))
            .send()
            .await
            .unwrap_err();

        let classified = classify_transport_error("core", timeout, err);
        assert_eq!(classified.kind(), "timeout");
    }

    #[test]
    fn test_upstream_display_without_status() {
        let err = InferError::Upstream {
            provider: "core".into(),
            status: None,
            message: "connection refused".into(),
        };
        assert!(!err.to_string().contains("status"));
    }
}
