//! GitHub OAuth authentication
//!
//! Handles:
//! - GitHub OAuth flow (authorization redirect and callback)
//! - Session context and signed session cookies
//! - Session gate

mod cookies;
mod gate;
mod github;
mod oauth;
pub mod session;

pub use gate::{GateDecision, SessionGate};
pub use github::{GitHubClient, GitHubProfile, parse_token_response};
pub use oauth::{
    CallbackOutcome, CallbackQuery, OAUTH_SCOPE, auth_router, build_authorize_url,
    exchange_code_for_profile, handle_callback, store_profile,
};
pub use session::{SessionContext, sign_session_id, verify_session_cookie};
