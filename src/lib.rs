//! github-signin - A minimal "Sign in with GitHub" login service
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Landing, protected and logout pages                      │
//! │  - /login and /callback (OAuth)                             │
//! │  - Health and metrics endpoints                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Auth Layer                             │
//! │  - Authorization redirect                                   │
//! │  - Token/profile exchange with GitHub                       │
//! │  - Session context and gate                                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SessionStore interface                                   │
//! │  - In-memory session store (moka)                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for the pages and metrics
//! - `auth`: GitHub OAuth flow, session context and gate
//! - `data`: Session models and storage
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the session store and HTTP client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Session store (injected; in-memory by default)
    pub sessions: Arc<dyn data::SessionStore>,

    /// GitHub API client
    pub github: Arc<auth::GitHubClient>,
}

impl AppState {
    /// Initialize application state with the in-memory session store
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let sessions = data::MemorySessionStore::new(config.session.ttl());
        tracing::info!(
            ttl_seconds = config.session.ttl_seconds,
            "Session store initialized"
        );

        Self::with_session_store(config, Arc::new(sessions))
    }

    /// Initialize application state around an existing session store
    pub fn with_session_store(
        config: config::AppConfig,
        sessions: Arc<dyn data::SessionStore>,
    ) -> Result<Self, error::AppError> {
        let github = auth::GitHubClient::new(&config.github)?;

        Ok(Self {
            config: Arc::new(config),
            sessions,
            github: Arc::new(github),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::pages_router())
        .merge(auth::auth_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
