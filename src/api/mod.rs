//! API layer
//!
//! HTTP handlers for:
//! - Landing, protected and logout pages
//! - Metrics (Prometheus)

pub mod metrics;
mod pages;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

pub use metrics::metrics_router;
pub use pages::{pages_router, render_landing, render_main};

/// 302 Found redirect
///
/// `axum::response::Redirect` only offers 303/307/308; browsers and the
/// identity provider flow expect a plain 302 here.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Fallback for methods a page route does not serve
pub(crate) async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
