//! GitHub API client
//!
//! Two calls, made in sequence during a callback:
//! 1. exchange the authorization code for an access token
//! 2. fetch the authenticated user's profile with that token
//!
//! Both share one pooled `reqwest::Client` carrying the configured
//! timeout and User-Agent.

use axum::http::header::ACCEPT;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Instant;

use crate::config::{GitHubOAuthConfig, TokenPlacement};
use crate::error::AppError;
use crate::metrics::{UPSTREAM_REQUEST_DURATION_SECONDS, UPSTREAM_REQUESTS_TOTAL};

/// Profile fields read from the user-info endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitHubProfile {
    pub login: String,
    /// Public email; GitHub returns `null` when the user hides it
    #[serde(default)]
    pub email: Option<String>,
}

/// Client for the identity provider's token and user-info endpoints
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubOAuthConfig,
}

impl GitHubClient {
    /// Build the client
    ///
    /// # Errors
    /// Returns error if the TLS backend cannot be initialized
    pub fn new(config: &GitHubOAuthConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// Exchange an authorization code for an access token
    ///
    /// # Errors
    /// - `UpstreamUnavailable` on timeout or connection failure
    /// - `TokenExchange` on a non-2xx status or a body without `access_token`
    pub async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        let started = Instant::now();
        let result = self
            .http
            .post(&self.config.token_url)
            .header(ACCEPT, "application/x-www-form-urlencoded")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await;
        let response = observe("token", started, result).map_err(token_error)?;

        let status = response.status();
        let body = response.text().await.map_err(token_error)?;
        if !status.is_success() {
            return Err(AppError::TokenExchange(format!(
                "token endpoint returned {status}"
            )));
        }

        parse_token_response(&body)
    }

    /// Fetch the profile of the user the access token belongs to
    ///
    /// # Errors
    /// - `UpstreamUnavailable` on timeout or connection failure
    /// - `ProfileFetch` on a non-2xx status or malformed JSON
    pub async fn fetch_profile(&self, access_token: &str) -> Result<GitHubProfile, AppError> {
        let request = self
            .http
            .get(&self.config.user_url)
            .header(ACCEPT, "application/vnd.github+json");
        let request = match self.config.token_placement {
            TokenPlacement::Header => request.bearer_auth(access_token),
            TokenPlacement::Query => request.query(&[("access_token", access_token)]),
        };

        let started = Instant::now();
        let response = observe("user", started, request.send().await)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ProfileFetch(format!(
                "user endpoint returned {status}"
            )));
        }

        let profile: GitHubProfile = response.json().await?;
        if profile.login.trim().is_empty() {
            return Err(AppError::ProfileFetch(
                "profile did not contain a login".to_string(),
            ));
        }

        Ok(profile)
    }
}

/// Record request metrics and pass the result through
fn observe(
    endpoint: &str,
    started: Instant,
    result: reqwest::Result<reqwest::Response>,
) -> reqwest::Result<reqwest::Response> {
    UPSTREAM_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .observe(started.elapsed().as_secs_f64());

    let status = match &result {
        Ok(response) => response.status().as_u16().to_string(),
        Err(error) if error.is_timeout() => "timeout".to_string(),
        Err(_) => "error".to_string(),
    };
    UPSTREAM_REQUESTS_TOTAL
        .with_label_values(&[endpoint, &status])
        .inc();

    result
}

fn token_error(err: reqwest::Error) -> AppError {
    match AppError::from(err) {
        AppError::ProfileFetch(message) => AppError::TokenExchange(message),
        other => other,
    }
}

/// Token endpoint body, in whichever encoding the provider chose
#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenResponse {
    fn from_form(body: &str) -> Self {
        let mut fields: HashMap<String, String> = url::form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect();

        Self {
            access_token: fields.remove("access_token"),
            error: fields.remove("error"),
            error_description: fields.remove("error_description"),
        }
    }
}

/// Extract the access token from a token endpoint body
///
/// The body is decoded as `key=value&...` form data into a map and
/// `access_token` is looked up directly, so field order and the presence
/// of other fields do not matter. A JSON object is accepted as well.
///
/// # Errors
/// `TokenExchange` if the provider reported an error or sent no token
pub fn parse_token_response(body: &str) -> Result<String, AppError> {
    let body = body.trim();
    let response = if body.starts_with('{') {
        serde_json::from_str::<TokenResponse>(body)
            .map_err(|e| AppError::TokenExchange(format!("malformed token response: {e}")))?
    } else {
        TokenResponse::from_form(body)
    };

    if let Some(error) = response.error {
        let description = response.error_description.unwrap_or_default();
        return Err(AppError::TokenExchange(
            format!("{error} {description}").trim_end().to_string(),
        ));
    }

    response
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::TokenExchange("response did not contain an access token".to_string())
        })
}
