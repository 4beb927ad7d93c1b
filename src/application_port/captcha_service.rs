use crate::domain_model::SessionId;
use crate::domain_port::CaptchaStoreError;
use chrono::{DateTime, Utc};

#[derive(Debug)]
pub struct CaptchaIssued {
    pub image_base64: String,
    pub expire_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    #[error("incorrect captcha code")]
    Incorrect,
    #[error("captcha not found or expired")]
    NotFoundOrExpired,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<CaptchaStoreError> for CaptchaError {
    fn from(err: CaptchaStoreError) -> Self {
        match err {
            CaptchaStoreError::Store(e) => CaptchaError::Store(e),
            CaptchaStoreError::InternalError(e) => CaptchaError::InternalError(e),
        }
    }
}

#[async_trait::async_trait]
pub trait CaptchaService: Send + Sync {
    /// Render a fresh challenge and bind it to the session, overwriting any
    /// prior slot for that session.
    async fn issue(&self, session: &SessionId) -> Result<CaptchaIssued, CaptchaError>;

    /// One-shot: the stored challenge is consumed by the first attempt,
    /// whether or not the answer matches. Comparison is case-insensitive.
    async fn verify(&self, session: &SessionId, answer: &str) -> Result<(), CaptchaError>;
}
