use crate::application_port::{CaptchaError, CaptchaIssued, CaptchaService};
use crate::domain_model::SessionId;
use chrono::Utc;
use std::time::Duration;

/// 1x1 white PNG; enough for clients that insist on rendering something.
const FAKE_CAPTCHA_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

/// The answer is always "1234". Useful for local runs and API tests where
/// the real image would make the code unknowable.
#[derive(Debug)]
pub struct FakeCaptchaService;

impl FakeCaptchaService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FakeCaptchaService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptchaService for FakeCaptchaService {
    async fn issue(&self, _session: &SessionId) -> Result<CaptchaIssued, CaptchaError> {
        let ttl = Duration::from_secs(300);
        Ok(CaptchaIssued {
            image_base64: FAKE_CAPTCHA_BASE64.to_string(),
            expire_at: Utc::now() + ttl,
        })
    }

    async fn verify(&self, _session: &SessionId, answer: &str) -> Result<(), CaptchaError> {
        match answer {
            "1234" => Ok(()),
            "0000" => Err(CaptchaError::InternalError(anyhow::anyhow!(
                "simulated internal error"
            ))),
            _ => Err(CaptchaError::Incorrect),
        }
    }
}
