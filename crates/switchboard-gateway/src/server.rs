//! Axum HTTP server wrapping the inference router

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tracing::info;

use switchboard_core::{InferError, InferenceRequest, InferenceRouter};

use crate::protocol::{ApiError, HealthBody};

/// Shared state for all request handlers
#[derive(Clone)]
pub struct GatewayState {
    pub router: Arc<InferenceRouter>,
    pub start_time: Instant,
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    /// Create a new gateway server around a router built at startup
    pub fn new(bind: SocketAddr, router: Arc<InferenceRouter>) -> Self {
        let state = GatewayState {
            router,
            start_time: Instant::now(),
        };
        Self { state, bind }
    }

    /// Build the axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/infer", post(infer_handler))
            .route("/v1/health", get(health_handler))
            .route("/api/status", get(status_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Start the server (blocks until shutdown)
    pub async fn run(self) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("Gateway listening on {}", self.bind);

        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Start the server in the background, returning a handle
    pub fn spawn(self) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

// ── HTTP handlers ──

async fn infer_handler(
    State(state): State<GatewayState>,
    request: Result<axum::Json<InferenceRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // A body that doesn't deserialize is the caller's fault, same as
    // a request that fails router validation.
    let axum::Json(request) =
        request.map_err(|e| InferError::Validation(e.body_text()))?;

    let result = state.router.infer(&request).await?;
    Ok(axum::Json(result))
}

async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let providers = state.router.providers();
    let status = if providers.iter().any(|p| p.configured) {
        "ok"
    } else {
        "unconfigured"
    };

    axum::Json(HealthBody {
        status: status.to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        providers,
    })
}

async fn status_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "default_provider": state.router.default_provider(),
    }))
}
