//! Session data models

use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use std::fmt;

/// Number of random bytes behind a session identifier
const SESSION_ID_BYTES: usize = 32;

/// Opaque session identifier
///
/// Random, URL-safe and independent of anything the identity provider
/// returns. Carried to the browser in a signed cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap an identifier recovered from a verified cookie
    pub(crate) fn from_verified(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fields a session may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    /// GitHub login of the signed-in visitor
    User,
    /// Public email of the signed-in visitor, may be withheld by GitHub
    Email,
}

/// Everything stored for one session
///
/// `user` is set iff a token exchange completed for this session.
/// `email` may be `None` even when `user` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRecord {
    pub user: Option<String>,
    pub email: Option<String>,
}

impl SessionRecord {
    pub fn field(&self, field: SessionField) -> Option<&str> {
        match field {
            SessionField::User => self.user.as_deref(),
            SessionField::Email => self.email.as_deref(),
        }
    }

    pub fn set_field(&mut self, field: SessionField, value: Option<String>) {
        match field {
            SessionField::User => self.user = value,
            SessionField::Email => self.email = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.email.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_url_safe() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
        assert!(
            a.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn record_fields_are_independent() {
        let mut record = SessionRecord::default();
        record.set_field(SessionField::User, Some("octocat".to_string()));
        assert_eq!(record.field(SessionField::User), Some("octocat"));
        assert_eq!(record.field(SessionField::Email), None);
        assert!(!record.is_empty());

        record.set_field(SessionField::User, None);
        assert!(record.is_empty());
    }
}
