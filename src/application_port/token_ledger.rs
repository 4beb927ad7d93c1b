use crate::domain_model::ResetToken;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct IssuedReset {
    pub token: ResetToken,
    pub email: String,
    /// Display name for the mail salutation; falls back to the address.
    pub recipient: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("reset token not found")]
    NotFound,
    #[error("reset token already used")]
    AlreadyUsed,
    #[error("reset token expired")]
    Expired,
    #[error("no account matches the reset token")]
    UserNotFound,
    #[error("store error: {0}")]
    Store(String),
}

#[async_trait::async_trait]
pub trait TokenLedger: Send + Sync {
    /// `Ok(None)` when the email is unknown, so the caller can answer
    /// identically either way. Issuing drops every prior token for the
    /// email before the new row lands.
    async fn issue(&self, email: &str) -> Result<Option<IssuedReset>, LedgerError>;

    /// Resolve a token to its email without consuming it.
    async fn validate(&self, token: &str) -> Result<String, LedgerError>;

    /// Single-use exchange: re-validate under a row lock, write the new
    /// password hash, mark the token used and drop its siblings, all in one
    /// transaction.
    async fn consume(&self, token: &str, new_password_hash: &str) -> Result<(), LedgerError>;
}
