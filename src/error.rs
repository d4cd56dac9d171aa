//! Error types for github-signin
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//! Login failures surfaced to the browser are additionally mapped to a
//! [`LoginError`] kind so the landing page can show them without echoing
//! anything the identity provider sent back.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Every failure is scoped to one request; none of these terminate the
/// process.
#[derive(Debug, Error)]
pub enum AppError {
    /// Non-GET request on a page route (405)
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Callback hit without a `code` query parameter (400)
    #[error("Authorization code missing from callback")]
    MissingAuthorizationCode,

    /// Callback `state` does not match the one issued at login (400)
    #[error("OAuth state mismatch")]
    InvalidState,

    /// Visitor declined the authorization request (403)
    #[error("Authorization denied: {0}")]
    AccessDenied(String),

    /// Token endpoint answered without an access token (502)
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// User-info endpoint failed or returned malformed JSON (502)
    #[error("Profile fetch failed: {0}")]
    ProfileFetch(String),

    /// Identity provider timed out or could not be reached (504)
    #[error("Identity provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Callback query string could not be decoded (400)
    #[error("Malformed callback query: {0}")]
    InvalidCallback(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signing key error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    /// Classify an outbound request failure
    ///
    /// Timeouts and connection failures mean the provider is unavailable;
    /// anything else happened while talking to it and is attributed to the
    /// profile fetch, the only call that decodes a body with reqwest.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            AppError::UpstreamUnavailable(err.to_string())
        } else {
            AppError::ProfileFetch(err.to_string())
        }
    }
}

impl AppError {
    /// Login error kind shown on the landing page, if this error is one
    /// the callback recovers from.
    pub fn login_error(&self) -> Option<LoginError> {
        match self {
            AppError::MissingAuthorizationCode => Some(LoginError::MissingCode),
            AppError::InvalidState => Some(LoginError::InvalidState),
            AppError::InvalidCallback(_) => Some(LoginError::InvalidCallback),
            AppError::AccessDenied(_) => Some(LoginError::AccessDenied),
            AppError::TokenExchange(_) => Some(LoginError::TokenExchange),
            AppError::ProfileFetch(_) => Some(LoginError::ProfileFetch),
            AppError::UpstreamUnavailable(_) => Some(LoginError::UpstreamUnavailable),
            _ => None,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::MethodNotAllowed => "method_not_allowed",
            AppError::MissingAuthorizationCode => "missing_code",
            AppError::InvalidState => "invalid_state",
            AppError::AccessDenied(_) => "access_denied",
            AppError::TokenExchange(_) => "token_exchange",
            AppError::ProfileFetch(_) => "profile_fetch",
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
            AppError::InvalidCallback(_) => "invalid_callback",
            AppError::Config(_) => "config",
            AppError::Encryption(_) => "encryption",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body. Upstream details stay in the logs.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message) = match &self {
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            AppError::MissingAuthorizationCode | AppError::InvalidState => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::InvalidCallback(_) => {
                (StatusCode::BAD_REQUEST, "Malformed callback query".to_string())
            }
            AppError::AccessDenied(_) => {
                (StatusCode::FORBIDDEN, "Authorization denied".to_string())
            }
            AppError::TokenExchange(_) => {
                (StatusCode::BAD_GATEWAY, "Token exchange failed".to_string())
            }
            AppError::ProfileFetch(_) => {
                (StatusCode::BAD_GATEWAY, "Profile fetch failed".to_string())
            }
            AppError::UpstreamUnavailable(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "Identity provider unavailable".to_string(),
            ),
            AppError::Encryption(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.error_type()]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        let mut response = (status, body).into_response();
        if matches!(self, AppError::MethodNotAllowed) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
        }
        response
    }
}

/// Login failure kinds carried in the landing page's `error` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    MissingCode,
    InvalidState,
    InvalidCallback,
    AccessDenied,
    TokenExchange,
    ProfileFetch,
    UpstreamUnavailable,
}

impl LoginError {
    /// Query-string representation
    pub fn as_str(self) -> &'static str {
        match self {
            LoginError::MissingCode => "missing_code",
            LoginError::InvalidState => "invalid_state",
            LoginError::InvalidCallback => "invalid_callback",
            LoginError::AccessDenied => "access_denied",
            LoginError::TokenExchange => "token_exchange",
            LoginError::ProfileFetch => "profile_fetch",
            LoginError::UpstreamUnavailable => "upstream_unavailable",
        }
    }

    /// Parse a query value, ignoring anything unknown
    pub fn parse(value: &str) -> Option<Self> {
        [
            LoginError::MissingCode,
            LoginError::InvalidState,
            LoginError::InvalidCallback,
            LoginError::AccessDenied,
            LoginError::TokenExchange,
            LoginError::ProfileFetch,
            LoginError::UpstreamUnavailable,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == value)
    }

    /// Human-readable message for the landing page
    pub fn message(self) -> &'static str {
        match self {
            LoginError::MissingCode => "GitHub did not return an authorization code.",
            LoginError::InvalidState => "The sign-in request expired or did not match. Please try again.",
            LoginError::InvalidCallback => "GitHub sent back a sign-in response that could not be read.",
            LoginError::AccessDenied => "Sign-in was cancelled on GitHub.",
            LoginError::TokenExchange => "GitHub refused to issue an access token.",
            LoginError::ProfileFetch => "Your GitHub profile could not be read.",
            LoginError::UpstreamUnavailable => "GitHub is not responding right now. Please try again later.",
        }
    }

    /// Landing page location carrying this error
    pub fn landing_location(self) -> String {
        format!("/?error={}", self.as_str())
    }
}
