//! `GET /metrics`
//!
//! Prometheus text exposition of the sign-in instruments registered in
//! [`crate::metrics`]: login redirects, callback outcomes, logouts,
//! upstream GitHub request counts and latency, live sessions and error
//! responses by type.

use axum::{
    Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, TextEncoder};

use crate::metrics::REGISTRY;

/// Render the sign-in registry
///
/// An encoding failure is logged and answered with a bare 500 so a
/// scraper never sees a partial exposition.
async fn scrape() -> Response {
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&REGISTRY.gather()) {
        Ok(body) => (
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode sign-in metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Router for `/metrics`, independent of application state so it can be
/// merged after `with_state`
pub fn metrics_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/metrics", get(scrape))
}
