//! Session gate
//!
//! Decides whether a visitor is signed in. The decision is a pure
//! function of the session record: the gate never writes.

use crate::data::SessionRecord;

/// Where a session stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// No `user` in the session; send the visitor to the landing page
    Anonymous,
    /// `user` present; protected content may be shown
    Authenticated {
        user: String,
        email: Option<String>,
    },
}

impl GateDecision {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, GateDecision::Authenticated { .. })
    }
}

pub struct SessionGate;

impl SessionGate {
    /// Evaluate a session record
    ///
    /// Only the presence of `user` matters; a null `email` does not
    /// demote an authenticated session.
    pub fn evaluate(record: &SessionRecord) -> GateDecision {
        match &record.user {
            Some(user) => GateDecision::Authenticated {
                user: user.clone(),
                email: record.email.clone(),
            },
            None => GateDecision::Anonymous,
        }
    }
}
