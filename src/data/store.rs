//! Session store interface
//!
//! Handlers never reach for ambient session state; they receive a
//! [`SessionId`](super::SessionId) and go through this trait.

use axum::async_trait;

use super::models::{SessionField, SessionId, SessionRecord};
use crate::error::AppError;

/// Per-visitor key/value storage keyed by session identifier
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read one field; `None` if the session or the field is absent
    async fn get(&self, id: &SessionId, field: SessionField) -> Result<Option<String>, AppError>;

    /// Write one field, replacing any prior value. `None` unsets it.
    async fn set(
        &self,
        id: &SessionId,
        field: SessionField,
        value: Option<String>,
    ) -> Result<(), AppError>;

    /// Drop every field of the session
    async fn clear(&self, id: &SessionId) -> Result<(), AppError>;

    /// Read the whole record
    async fn load(&self, id: &SessionId) -> Result<SessionRecord, AppError> {
        Ok(SessionRecord {
            user: self.get(id, SessionField::User).await?,
            email: self.get(id, SessionField::Email).await?,
        })
    }
}
