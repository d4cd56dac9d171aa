//! In-memory session store
//!
//! Sessions are volatile and cleared on restart.
//! Uses Moka for high-performance concurrent caching.

use axum::async_trait;
use moka::future::Cache;
use std::time::Duration;

use super::models::{SessionField, SessionId, SessionRecord};
use super::store::SessionStore;
use crate::error::AppError;

/// Upper bound on concurrently held sessions
const MAX_SESSIONS: u64 = 100_000;

/// Session store backed by a Moka cache
///
/// Each entry expires `ttl` after it was last written.
/// LRU eviction when capacity is reached.
pub struct MemorySessionStore {
    /// Session ID -> SessionRecord
    sessions: Cache<String, SessionRecord>,
}

impl MemorySessionStore {
    /// Create new session store
    ///
    /// # Arguments
    /// * `ttl` - Lifetime of a session after its last write
    pub fn new(ttl: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_live(ttl)
            .build();

        Self { sessions }
    }

    /// Publish the live session count
    async fn record_size(&self) {
        use crate::metrics::SESSIONS_ACTIVE;
        SESSIONS_ACTIVE.set(self.session_count().await as i64);
    }

    /// Number of live sessions
    ///
    /// Moka applies inserts and invalidations lazily; flushing them first
    /// keeps the count exact.
    pub async fn session_count(&self) -> u64 {
        self.sessions.run_pending_tasks().await;
        self.sessions.entry_count()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &SessionId, field: SessionField) -> Result<Option<String>, AppError> {
        Ok(self
            .sessions
            .get(id.as_str())
            .await
            .and_then(|record| record.field(field).map(ToOwned::to_owned)))
    }

    async fn set(
        &self,
        id: &SessionId,
        field: SessionField,
        value: Option<String>,
    ) -> Result<(), AppError> {
        let mut record = self.sessions.get(id.as_str()).await.unwrap_or_default();
        record.set_field(field, value);

        if record.is_empty() {
            self.sessions.invalidate(id.as_str()).await;
        } else {
            self.sessions.insert(id.as_str().to_owned(), record).await;
        }

        self.record_size().await;
        Ok(())
    }

    async fn clear(&self, id: &SessionId) -> Result<(), AppError> {
        self.sessions.invalidate(id.as_str()).await;
        self.record_size().await;
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<SessionRecord, AppError> {
        Ok(self.sessions.get(id.as_str()).await.unwrap_or_default())
    }
}
