//! Pages
//!
//! - GET / - landing page with the sign-in link
//! - GET /main - protected page greeting the signed-in user
//! - GET /logout - clears the session

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::{found, method_not_allowed};
use crate::AppState;
use crate::auth::{GateDecision, SessionContext};
use crate::error::{AppError, LoginError};
use crate::metrics::LOGOUTS_TOTAL;

/// Create pages router
///
/// Routes:
/// - GET / - Landing page
/// - GET /main - Protected page
/// - GET /logout - Logout
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing).fallback(method_not_allowed))
        .route("/main", get(main_page).fallback(method_not_allowed))
        .route("/logout", get(logout).fallback(method_not_allowed))
}

// =============================================================================
// Landing Page
// =============================================================================

#[derive(Debug, Deserialize)]
struct LandingQuery {
    error: Option<String>,
}

/// GET /
///
/// Signed-in visitors are forwarded to the callback, which sends them on
/// to /main. Everyone else gets the sign-in prompt. An `error` value that
/// does not decode is dropped rather than rejected.
async fn landing(
    State(state): State<AppState>,
    session: SessionContext,
    jar: CookieJar,
    query: Result<Query<LandingQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let jar = session.attach(jar, &state.config)?;

    if session.gate().is_authenticated() {
        return Ok((jar, found("/callback")).into_response());
    }

    let error = query
        .ok()
        .and_then(|Query(query)| query.error)
        .as_deref()
        .and_then(LoginError::parse);
    Ok((jar, Html(render_landing(error))).into_response())
}

/// Render the sign-in prompt, with a notice if the last attempt failed
pub fn render_landing(error: Option<LoginError>) -> String {
    let notice = error
        .map(|kind| format!(r#"<p class="error">{}</p>"#, kind.message()))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Sign In with GitHub</title>
</head>
<body>
    <div class="content">
        {notice}
        <p>Hello, world.</p>
        <p><a href="/login">Sign In with GitHub</a></p>
    </div>
</body>
</html>
"#
    )
}

// =============================================================================
// Protected Page
// =============================================================================

/// GET /main
///
/// Anonymous visitors are sent back to the landing page.
async fn main_page(
    State(state): State<AppState>,
    session: SessionContext,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let jar = session.attach(jar, &state.config)?;

    match session.gate() {
        GateDecision::Anonymous => Ok((jar, found("/")).into_response()),
        GateDecision::Authenticated { user, email } => {
            Ok((jar, Html(render_main(&user, email.as_deref()))).into_response())
        }
    }
}

/// Render the greeting for a signed-in user
pub fn render_main(user: &str, email: Option<&str>) -> String {
    let user = html_escape::encode_text(user);
    let email = match email {
        Some(email) => html_escape::encode_text(email).into_owned(),
        None => "not public".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Sign Out with GitHub</title>
</head>
<body>
    <div class="content">
        <p>Hello, {user}.</p>
        <p>Your public email address is:<br/>
        {email}.</p>
        <p><a href="/logout">Sign Out with GitHub</a></p>
    </div>
</body>
</html>
"#
    )
}

// =============================================================================
// Logout
// =============================================================================

/// GET /logout
///
/// Clears the session and its cookie, then redirects to the landing page.
async fn logout(
    State(state): State<AppState>,
    session: SessionContext,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if !session.is_fresh() {
        state.sessions.clear(session.id()).await?;
    }

    LOGOUTS_TOTAL.inc();
    tracing::info!(
        was_signed_in = session.gate().is_authenticated(),
        "Session cleared"
    );

    Ok((session.detach(jar, &state.config), found("/")).into_response())
}
