//! HTTP API for the translation service.
//!
//! This crate exposes [`nmt_core`]'s translation engine, model cache, and
//! queue manager over HTTP: translation endpoints, language metadata and
//! detection, observability (health/readiness/cache/model-info), and model
//! discovery. See spec §6.

pub mod error;
pub mod maintenance;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;

pub use server::WebServer;
pub use state::AppState;

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 3000,
        }
    }
}
