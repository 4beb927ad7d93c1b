use crate::application_port::{CaptchaError, CaptchaIssued, CaptchaService};
use crate::domain_model::SessionId;
use crate::domain_port::CaptchaStore;
use captcha_rs::CaptchaBuilder;
use chrono::Utc;
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;

const CODE_LENGTH: usize = 4;
const CHALLENGE_TTL: Duration = Duration::from_secs(300);

pub struct RealCaptchaService {
    store: Arc<dyn CaptchaStore>,
    hmac_key: Vec<u8>,
}

impl RealCaptchaService {
    pub fn new(store: Arc<dyn CaptchaStore>, hmac_key: Vec<u8>) -> Self {
        Self { store, hmac_key }
    }

    /// Uppercases before hashing, which is what makes verification
    /// case-insensitive.
    fn hmac_hex(&self, code: &str) -> anyhow::Result<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.hmac_key)?;
        mac.update(code.to_uppercase().as_bytes());
        let out = mac.finalize().into_bytes();
        Ok(hex::encode(out))
    }
}

#[async_trait::async_trait]
impl CaptchaService for RealCaptchaService {
    async fn issue(&self, session: &SessionId) -> Result<CaptchaIssued, CaptchaError> {
        let captcha = CaptchaBuilder::new()
            .length(CODE_LENGTH)
            .width(120)
            .height(40)
            .dark_mode(false)
            .complexity(1)
            .compression(40)
            .build();

        let code_hmac = self.hmac_hex(&captcha.text)?;
        let expire_at = Utc::now() + CHALLENGE_TTL;
        self.store.save(session, &code_hmac, expire_at).await?;

        let with_prefix = captcha.to_base64();
        let clean = with_prefix
            .split_once(',')
            .map(|(_, d)| d)
            .unwrap_or(with_prefix.as_str());
        Ok(CaptchaIssued {
            image_base64: clean.to_owned(),
            expire_at,
        })
    }

    async fn verify(&self, session: &SessionId, answer: &str) -> Result<(), CaptchaError> {
        // take() removes the slot up front; a retry against the same
        // challenge sees NotFoundOrExpired no matter how this call ends
        let expected = self
            .store
            .take(session)
            .await?
            .ok_or(CaptchaError::NotFoundOrExpired)?;

        let provided = self.hmac_hex(answer)?;
        if provided != expected {
            return Err(CaptchaError::Incorrect);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_mem::MemCaptchaStore;

    fn service() -> (RealCaptchaService, Arc<MemCaptchaStore>) {
        let store = Arc::new(MemCaptchaStore::new());
        let service = RealCaptchaService::new(store.clone(), b"test-key".to_vec());
        (service, store)
    }

    #[tokio::test]
    async fn verify_accepts_any_case() {
        let (service, store) = service();
        let session = SessionId::generate();

        let hash = service.hmac_hex("7QX2").unwrap();
        store
            .save(&session, &hash, Utc::now() + CHALLENGE_TTL)
            .await
            .unwrap();

        service.verify(&session, "7qx2").await.unwrap();
    }

    #[tokio::test]
    async fn challenge_is_consumed_even_on_success() {
        let (service, store) = service();
        let session = SessionId::generate();

        let hash = service.hmac_hex("AB12").unwrap();
        store
            .save(&session, &hash, Utc::now() + CHALLENGE_TTL)
            .await
            .unwrap();

        service.verify(&session, "AB12").await.unwrap();
        let second = service.verify(&session, "AB12").await;
        assert!(matches!(second, Err(CaptchaError::NotFoundOrExpired)));
    }

    #[tokio::test]
    async fn challenge_is_consumed_on_failure() {
        let (service, _store) = service();
        let session = SessionId::generate();

        service.issue(&session).await.unwrap();

        let first = service.verify(&session, "????").await;
        assert!(matches!(first, Err(CaptchaError::Incorrect)));

        // the slot is gone, not retryable
        let second = service.verify(&session, "????").await;
        assert!(matches!(second, Err(CaptchaError::NotFoundOrExpired)));
    }

    #[tokio::test]
    async fn issue_overwrites_previous_challenge() {
        let (service, store) = service();
        let session = SessionId::generate();

        let hash = service.hmac_hex("OLD1").unwrap();
        store
            .save(&session, &hash, Utc::now() + CHALLENGE_TTL)
            .await
            .unwrap();

        service.issue(&session).await.unwrap();

        let stale = service.verify(&session, "OLD1").await;
        assert!(matches!(stale, Err(CaptchaError::Incorrect)));
    }

    #[tokio::test]
    async fn missing_session_slot_is_rejected() {
        let (service, _store) = service();
        let session = SessionId::generate();

        let result = service.verify(&session, "AAAA").await;
        assert!(matches!(result, Err(CaptchaError::NotFoundOrExpired)));
    }
}
