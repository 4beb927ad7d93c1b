use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a registrant. Uniqueness of `email` is the store's job; a
    /// duplicate maps to `AuthError::EmailTaken`.
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        title: &str,
    ) -> Result<UserId, AuthError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError>;

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), AuthError>;

    /// Returns the number of rows touched, so the caller can tell a vanished
    /// user from a successful update.
    async fn update_password_by_email_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        email: &str,
        password_hash: &str,
    ) -> Result<u64, AuthError>;
}
