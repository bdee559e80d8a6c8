use crate::shared::error::BotResult;
use crate::shared::types::{InstanceRecord, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Where a command flow currently stands. A flow with no record is idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    AwaitingSelection,
    AwaitingAction { selected: InstanceRecord },
}

/// Per-flow selection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub touched_at: DateTime<Utc>,
    pub instances: Vec<InstanceRecord>,
    pub state: SessionState,
}

impl SessionRecord {
    pub fn new(
        session_id: SessionId,
        owner_id: impl Into<String>,
        instances: Vec<InstanceRecord>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            owner_id: owner_id.into(),
            created_at: now,
            touched_at: now,
            instances,
            state: SessionState::AwaitingSelection,
        }
    }

    pub fn find_instance(&self, instance_id: &str) -> Option<&InstanceRecord> {
        self.instances.iter().find(|r| r.instance_id == instance_id)
    }

    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        (now - self.touched_at)
            .to_std()
            .map(|idle| idle > ttl)
            .unwrap_or(false)
    }
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Live session for the id; expired sessions read as absent
    async fn get(&self, session_id: &SessionId, now: DateTime<Utc>)
        -> BotResult<Option<SessionRecord>>;
    async fn put(&self, record: SessionRecord) -> BotResult<()>;
    /// Overwrite a session only while it is still live. Returns false when
    /// the session was removed or expired in the meantime.
    async fn replace(&self, record: SessionRecord, now: DateTime<Utc>) -> BotResult<bool>;
    async fn remove(&self, session_id: &SessionId) -> BotResult<Option<SessionRecord>>;
    /// Drop every expired session; returns how many were dropped
    async fn evict_expired(&self, now: DateTime<Utc>) -> BotResult<usize>;
    async fn len(&self) -> BotResult<usize>;
}

#[derive(Clone)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<SessionId, SessionRecord>>>,
    ttl: Duration,
}

impl InMemorySessionRepository {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn get(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> BotResult<Option<SessionRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .filter(|record| !record.is_expired(now, self.ttl))
            .cloned())
    }

    async fn put(&self, record: SessionRecord) -> BotResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(record.session_id.clone(), record);
        Ok(())
    }

    async fn replace(&self, record: SessionRecord, now: DateTime<Utc>) -> BotResult<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&record.session_id) {
            Some(current) if !current.is_expired(now, self.ttl) => {
                *current = record;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove(&self, session_id: &SessionId) -> BotResult<Option<SessionRecord>> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(session_id))
    }

    async fn evict_expired(&self, now: DateTime<Utc>) -> BotResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired(now, self.ttl));
        Ok(before - sessions.len())
    }

    async fn len(&self) -> BotResult<usize> {
        Ok(self.sessions.read().await.len())
    }
}
