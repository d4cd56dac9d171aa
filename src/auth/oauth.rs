//! GitHub OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub.

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use serde::Deserialize;

use super::cookies;
use super::github::GitHubProfile;
use super::session::SessionContext;
use crate::AppState;
use crate::api::{found, method_not_allowed};
use crate::config::GitHubOAuthConfig;
use crate::data::{SessionField, SessionId, SessionStore};
use crate::error::AppError;
use crate::metrics::{CALLBACKS_TOTAL, LOGIN_REDIRECTS_TOTAL};

/// Read-only access to the user's profile
pub const OAUTH_SCOPE: &str = "read:user";

/// Create authentication router
///
/// Routes:
/// - GET /login - Redirect to GitHub
/// - GET /callback - OAuth callback
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(github_redirect).fallback(method_not_allowed))
        .route("/callback", get(github_callback).fallback(method_not_allowed))
}

// =============================================================================
// Authorization Redirect
// =============================================================================

/// Build the provider authorization URL
///
/// Each of `client_id`, `redirect_uri`, `scope` and `state` is appended
/// exactly once, URL-encoded.
pub fn build_authorize_url(
    config: &GitHubOAuthConfig,
    state: &str,
) -> Result<url::Url, AppError> {
    let mut url = url::Url::parse(&config.authorize_url)
        .map_err(|e| AppError::Config(format!("github.authorize_url: {e}")))?;

    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", OAUTH_SCOPE)
        .append_pair("state", state);

    Ok(url)
}

/// GET /login
///
/// Redirects user to GitHub authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect (302) to GitHub with client_id, redirect_uri, scope, state
async fn github_redirect(
    State(state): State<AppState>,
    session: SessionContext,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let csrf_state = generate_csrf_state();
    let url = build_authorize_url(&state.config.github, &csrf_state)?;

    let jar = session
        .attach(jar, &state.config)?
        .add(cookies::state_cookie(
            &csrf_state,
            state.config.should_use_secure_cookies(),
        ));

    LOGIN_REDIRECTS_TOTAL.inc();
    tracing::info!(session_fresh = session.is_fresh(), "Redirecting to GitHub authorization");

    Ok((jar, found(url.as_str())).into_response())
}

// =============================================================================
// Callback
// =============================================================================

/// Query parameters from GitHub callback
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code
    pub code: Option<String>,
    /// CSRF state token
    pub state: Option<String>,
    /// Set by GitHub when the visitor declines or the request is invalid
    pub error: Option<String>,
}

/// What a callback did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Exchange completed; the profile was stored under a new session
    /// identifier and the previous one was cleared
    SignedIn {
        profile: GitHubProfile,
        session: SessionId,
    },
    /// No code, but the session was already signed in
    AlreadySignedIn,
}

/// GET /callback
///
/// Handles OAuth callback from GitHub.
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for access token
/// 3. Fetch user info from GitHub
/// 4. Store login and email under a new session identifier
/// 5. Redirect to /main if signed in, otherwise back to / with the error
async fn github_callback(
    State(state): State<AppState>,
    session: SessionContext,
    jar: CookieJar,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let expected_state = cookies::get_state(&jar);
    let jar = jar.add(cookies::clear_state_cookie());

    let outcome = match query {
        Ok(Query(query)) => {
            handle_callback(&state, &session, query, expected_state.as_deref()).await
        }
        Err(rejection) => Err(AppError::InvalidCallback(rejection.body_text())),
    };

    match outcome {
        Ok(CallbackOutcome::SignedIn { profile, session: id }) => {
            CALLBACKS_TOTAL.with_label_values(&["success"]).inc();
            tracing::info!(
                user = %profile.login,
                has_email = profile.email.is_some(),
                "GitHub sign-in completed"
            );
            let jar = SessionContext::issue(jar, &state.config, &id)?;
            Ok((jar, found("/main")).into_response())
        }
        Ok(CallbackOutcome::AlreadySignedIn) => {
            CALLBACKS_TOTAL.with_label_values(&["already_signed_in"]).inc();
            let jar = session.attach(jar, &state.config)?;
            Ok((jar, found("/main")).into_response())
        }
        Err(error) => {
            let Some(kind) = error.login_error() else {
                return Err(error);
            };

            CALLBACKS_TOTAL.with_label_values(&[kind.as_str()]).inc();
            tracing::warn!(error = %error, "GitHub sign-in failed");
            let jar = session.attach(jar, &state.config)?;

            // A session signed in earlier stays signed in
            if session.gate().is_authenticated() {
                return Ok((jar, found("/main")).into_response());
            }
            Ok((jar, found(&kind.landing_location())).into_response())
        }
    }
}

/// Run the callback against a session
///
/// The store is only written when both upstream calls succeed; every
/// failure leaves the current session untouched. On success the profile
/// goes under a freshly generated identifier and the old one is cleared,
/// so an identifier handed out before sign-in never becomes authenticated.
pub async fn handle_callback(
    state: &AppState,
    session: &SessionContext,
    query: CallbackQuery,
    expected_state: Option<&str>,
) -> Result<CallbackOutcome, AppError> {
    if let Some(error) = query.error {
        return Err(if error == "access_denied" {
            AppError::AccessDenied(error)
        } else {
            AppError::TokenExchange(error)
        });
    }

    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        if session.gate().is_authenticated() {
            return Ok(CallbackOutcome::AlreadySignedIn);
        }
        return Err(AppError::MissingAuthorizationCode);
    };

    verify_csrf_state(query.state.as_deref(), expected_state)?;

    let profile = exchange_code_for_profile(state, &code).await?;

    let rotated = SessionId::generate();
    store_profile(state.sessions.as_ref(), &rotated, &profile).await?;
    state.sessions.clear(session.id()).await?;

    Ok(CallbackOutcome::SignedIn {
        profile,
        session: rotated,
    })
}

/// Exchange the code for a token, then fetch the profile with it
pub async fn exchange_code_for_profile(
    state: &AppState,
    code: &str,
) -> Result<GitHubProfile, AppError> {
    let access_token = state.github.exchange_code(code).await?;
    state.github.fetch_profile(&access_token).await
}

/// Write the profile into the session, replacing prior values
pub async fn store_profile(
    sessions: &dyn SessionStore,
    id: &SessionId,
    profile: &GitHubProfile,
) -> Result<(), AppError> {
    sessions
        .set(id, SessionField::User, Some(profile.login.clone()))
        .await?;
    sessions
        .set(id, SessionField::Email, profile.email.clone())
        .await
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(returned: Option<&str>, expected: Option<&str>) -> Result<(), AppError> {
    match (returned, expected) {
        (Some(returned), Some(expected)) if returned == expected => Ok(()),
        _ => Err(AppError::InvalidState),
    }
}
