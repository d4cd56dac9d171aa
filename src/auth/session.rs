//! Session context
//!
//! The browser carries only an HMAC-signed session identifier; the
//! session fields themselves live in the injected [`SessionStore`].
//! Every page handler takes a [`SessionContext`] instead of reaching for
//! ambient state.
//!
//! [`SessionStore`]: crate::data::SessionStore

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::cookies;
use super::gate::{GateDecision, SessionGate};
use crate::AppState;
use crate::config::AppConfig;
use crate::data::{SessionId, SessionRecord};
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Create the signed cookie value for a session
///
/// Format: `{session_id}.base64(hmac_sha256(session_id))`
pub fn sign_session_id(id: &SessionId, secret: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(id.as_str().as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", id, signature_b64))
}

/// Verify a session cookie value and recover the identifier
///
/// Returns `None` for malformed or tampered values; the caller then
/// starts a fresh session.
pub fn verify_session_cookie(value: &str, secret: &str) -> Option<SessionId> {
    let (id, signature_b64) = value.split_once('.')?;
    if id.is_empty() {
        return None;
    }

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .ok()?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(id.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(SessionId::from_verified(id.to_owned()))
}

/// Session of the visitor making the current request
///
/// Resolved from the signed session cookie. A missing or invalid cookie
/// yields a fresh, empty session whose cookie is issued by
/// [`SessionContext::attach`].
#[derive(Debug, Clone)]
pub struct SessionContext {
    id: SessionId,
    fresh: bool,
    record: SessionRecord,
}

impl SessionContext {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Whether the identifier was created for this request
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Routing decision for this session
    pub fn gate(&self) -> GateDecision {
        SessionGate::evaluate(&self.record)
    }

    /// Add the session cookie to the response if the session is new
    pub fn attach(&self, jar: CookieJar, config: &AppConfig) -> Result<CookieJar, AppError> {
        if !self.fresh {
            return Ok(jar);
        }

        Self::issue(jar, config, &self.id)
    }

    /// Point the browser at `id`, restarting the cookie lifetime
    pub fn issue(
        jar: CookieJar,
        config: &AppConfig,
        id: &SessionId,
    ) -> Result<CookieJar, AppError> {
        let value = sign_session_id(id, &config.session.secret)?;
        Ok(jar.add(cookies::session_cookie(config, value)))
    }

    /// Remove the session cookie from the browser
    pub fn detach(&self, jar: CookieJar, config: &AppConfig) -> CookieJar {
        jar.add(cookies::clear_session_cookie(&config.session.cookie_name))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<SessionContext>().cloned() {
            return Ok(context);
        }

        let state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let verified = jar
            .get(&state.config.session.cookie_name)
            .and_then(|cookie| verify_session_cookie(cookie.value(), &state.config.session.secret));

        let context = match verified {
            Some(id) => {
                let record = state.sessions.load(&id).await?;
                SessionContext {
                    id,
                    fresh: false,
                    record,
                }
            }
            None => {
                tracing::debug!("No valid session cookie; starting a new session");
                SessionContext {
                    id: SessionId::generate(),
                    fresh: true,
                    record: SessionRecord::default(),
                }
            }
        };

        parts.extensions.insert(context.clone());
        Ok(context)
    }
}
