use crate::application_port::AuthError;
use crate::domain_model::{SessionId, UserId};

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(
        &self,
        session: &SessionId,
        user_id: UserId,
        ttl_secs: u64,
    ) -> Result<(), AuthError>;

    async fn get(&self, session: &SessionId) -> Result<Option<UserId>, AuthError>;

    /// Deleting an absent session is fine; logout is idempotent.
    async fn delete(&self, session: &SessionId) -> Result<(), AuthError>;
}
