use crate::application_port::AuthError;
use crate::domain_model::{SessionId, UserId};
use crate::domain_port::SessionStore;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

#[derive(Default)]
pub struct MemSessionStore {
    sessions: DashMap<String, (UserId, DateTime<Utc>)>,
}

impl MemSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemSessionStore {
    async fn save(
        &self,
        session: &SessionId,
        user_id: UserId,
        ttl_secs: u64,
    ) -> Result<(), AuthError> {
        let expire_at = Utc::now() + Duration::seconds(ttl_secs as i64);
        self.sessions
            .insert(session.as_str().to_owned(), (user_id, expire_at));
        Ok(())
    }

    async fn get(&self, session: &SessionId) -> Result<Option<UserId>, AuthError> {
        // the shard guard must drop before the expired slot is removed
        let expired = match self.sessions.get(session.as_str()) {
            Some(entry) if entry.1 > Utc::now() => return Ok(Some(entry.0)),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.remove(session.as_str());
        }
        Ok(None)
    }

    async fn delete(&self, session: &SessionId) -> Result<(), AuthError> {
        self.sessions.remove(session.as_str());
        Ok(())
    }
}
