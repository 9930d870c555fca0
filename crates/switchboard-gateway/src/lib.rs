//! switchboard-gateway - HTTP surface for the inference router
//!
//! A thin axum server: one inference route, a health route that
//! surfaces per-provider configuration state, and a liveness probe.
//! All routing and provider logic lives in `switchboard-core`.

pub mod protocol;
pub mod server;

pub use protocol::ErrorBody;
pub use server::GatewayServer;
