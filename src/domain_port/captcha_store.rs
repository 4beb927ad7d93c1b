use crate::domain_model::SessionId;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait CaptchaStore: Send + Sync {
    /// Store the challenge hash for a session, replacing any prior slot.
    async fn save(
        &self,
        session: &SessionId,
        code_hash_hex: &str,
        expire_at: DateTime<Utc>,
    ) -> Result<(), CaptchaStoreError>;

    /// Remove and return the stored hash. The slot is gone after this call,
    /// whatever the caller decides about the answer.
    async fn take(&self, session: &SessionId) -> Result<Option<String>, CaptchaStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptchaStoreError {
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
