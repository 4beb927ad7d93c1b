use crate::domain_model::SessionId;
use crate::domain_port::{CaptchaStore, CaptchaStoreError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Default)]
pub struct MemCaptchaStore {
    slots: DashMap<String, (String, DateTime<Utc>)>,
}

impl MemCaptchaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CaptchaStore for MemCaptchaStore {
    async fn save(
        &self,
        session: &SessionId,
        code_hash_hex: &str,
        expire_at: DateTime<Utc>,
    ) -> Result<(), CaptchaStoreError> {
        self.slots
            .insert(session.as_str().to_owned(), (code_hash_hex.to_owned(), expire_at));
        Ok(())
    }

    async fn take(&self, session: &SessionId) -> Result<Option<String>, CaptchaStoreError> {
        match self.slots.remove(session.as_str()) {
            Some((_, (hash, expire_at))) if expire_at > Utc::now() => Ok(Some(hash)),
            _ => Ok(None),
        }
    }
}
