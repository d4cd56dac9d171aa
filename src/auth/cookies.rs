use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::config::AppConfig;

/// Cookie carrying the OAuth `state` between `/login` and `/callback`
pub(super) const STATE_COOKIE_NAME: &str = "oauth_state";

/// How long a started sign-in may take before its state expires
const STATE_MAX_AGE_MINUTES: i64 = 10;

/// Create the session cookie holding the signed session identifier.
pub(super) fn session_cookie(config: &AppConfig, value: String) -> Cookie<'static> {
    Cookie::build((config.session.cookie_name.clone(), value))
        .http_only(config.session.http_only)
        .secure(config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(
            i64::try_from(config.session.ttl_seconds).unwrap_or(i64::MAX),
        ))
        .build()
}

/// Create removal cookie for session.
pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Create the state cookie for the authorization request.
pub(super) fn state_cookie(state: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::minutes(STATE_MAX_AGE_MINUTES))
        .build()
}

/// Create removal cookie for the state.
pub(super) fn clear_state_cookie() -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Get the state from cookies.
pub(super) fn get_state(jar: &CookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|value| !value.is_empty())
}
