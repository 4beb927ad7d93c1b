use crate::domain_model::SessionId;
use crate::domain_port::{CaptchaStore, CaptchaStoreError};
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

pub struct RedisCaptchaStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisCaptchaStore {
    pub fn new(conn: ConnectionManager, prefix: String) -> Self {
        RedisCaptchaStore { conn, prefix }
    }

    fn key(&self, session: &SessionId) -> String {
        format!("{}:{}", self.prefix, session)
    }
}

#[async_trait::async_trait]
impl CaptchaStore for RedisCaptchaStore {
    async fn save(
        &self,
        session: &SessionId,
        code_hash_hex: &str,
        expire_at: DateTime<Utc>,
    ) -> Result<(), CaptchaStoreError> {
        let key = &self.key(session);
        let mut conn = self.conn.clone();

        let _: () = conn
            .set(key, code_hash_hex)
            .await
            .map_err(|e| CaptchaStoreError::Store(e.to_string()))?;
        let _: () = conn
            .expire_at(key, expire_at.timestamp())
            .await
            .map_err(|e| CaptchaStoreError::Store(e.to_string()))?;

        Ok(())
    }

    async fn take(&self, session: &SessionId) -> Result<Option<String>, CaptchaStoreError> {
        let key = &self.key(session);
        let mut conn = self.conn.clone();

        // GETDEL: the read and the removal are one round trip, so two
        // racing attempts cannot both see the slot
        let val: Option<String> = conn
            .get_del(key)
            .await
            .map_err(|e| CaptchaStoreError::Store(e.to_string()))?;

        Ok(val)
    }
}
