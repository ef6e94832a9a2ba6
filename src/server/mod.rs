//! HTTP front end
//!
//! ## Endpoints
//!
//! - `GET  /`            - token form, or the batch form once a token is stored
//! - `POST /token`       - store the registry token, redirect to `/`
//! - `POST /verify`      - chunked HTML results page, rows filled in as they resolve
//! - `POST /api/verify`  - SSE stream of `start` / `record` / `done` events
//! - `GET  /api/health`  - liveness probe

mod routes;
mod sinks;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::clock::{Sleeper, TokioSleeper};
use crate::config::VerifyConfig;
use crate::credential::{Credential, TokenStore};
use crate::dispatcher::Dispatcher;
use crate::error::{ConfigError, RenderError};
use crate::registry::RegistryLookup;
use crate::render::Renderer;
use crate::verifier::VerificationClient;

pub use sinks::{HtmlChunkSink, SseSink};

/// Shared state for all routes
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<VerifyConfig>,
    pub registry: Arc<dyn RegistryLookup>,
    pub tokens: TokenStore,
    pub renderer: Arc<Renderer>,
    pub sleeper: Arc<dyn Sleeper>,
}

impl AppState {
    pub fn new(config: VerifyConfig, registry: Arc<dyn RegistryLookup>) -> Result<Self, RenderError> {
        let tokens = TokenStore::new(config.token_file.clone());
        Ok(Self {
            config: Arc::new(config),
            registry,
            tokens,
            renderer: Arc::new(Renderer::new()?),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the clock used for pacing and backoff.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    fn dispatcher(&self) -> Result<Dispatcher, ConfigError> {
        Dispatcher::new(self.config.dispatch(), Arc::clone(&self.sleeper))
    }

    fn client(&self, credential: Credential) -> VerificationClient {
        VerificationClient::new(
            Arc::clone(&self.registry),
            credential,
            self.config.retry(),
            Arc::clone(&self.sleeper),
        )
    }
}

/// Build the full router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/token", post(routes::save_token))
        .route("/verify", post(routes::verify_html))
        .route("/api/verify", post(routes::verify_sse))
        .route("/api/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
