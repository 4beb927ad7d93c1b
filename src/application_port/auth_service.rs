use crate::application_port::LedgerError;
use crate::domain_model::{SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("current password is incorrect")]
    WrongPassword,
    #[error("email already registered")]
    EmailTaken,
    #[error("not signed in")]
    NotAuthenticated,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Reset(#[from] LedgerError),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub confirm_password: Option<String>,
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub session: SessionId,
    pub user: UserProfile,
}

#[derive(Debug, Clone)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

#[derive(Debug, Clone)]
pub struct ResetPasswordInput {
    pub token: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, input: RegisterInput) -> Result<UserProfile, AuthError>;
    async fn login(&self, input: LoginInput) -> Result<LoginResult, AuthError>;
    async fn logout(&self, session: &SessionId) -> Result<(), AuthError>;
    /// Resolve a session to its user id, or `NotAuthenticated`.
    async fn authenticate(&self, session: &SessionId) -> Result<UserId, AuthError>;
    async fn user_info(&self, session: &SessionId) -> Result<UserProfile, AuthError>;
    async fn change_password(
        &self,
        user_id: UserId,
        input: ChangePasswordInput,
    ) -> Result<(), AuthError>;
    /// Enumeration-safe: succeeds whether or not the email is registered;
    /// only malformed input or a store failure is an error.
    async fn forgot_password(&self, email: &str) -> Result<(), AuthError>;
    async fn validate_reset_token(&self, token: &str) -> Result<String, AuthError>;
    async fn reset_password(&self, input: ResetPasswordInput) -> Result<(), AuthError>;
}
