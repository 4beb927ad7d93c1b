use tracing::info;

#[derive(Debug, Clone)]
pub struct ResetMail {
    pub to: String,
    pub recipient: String,
    pub reset_url: String,
    pub valid_minutes: i64,
}

/// Outbound mail port. SMTP delivery itself lives outside this service;
/// callers must not let a delivery failure change their response shape.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send_reset(&self, mail: &ResetMail) -> anyhow::Result<()>;
}

/// Writes the mail to the log instead of a wire.
#[derive(Debug, Default)]
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send_reset(&self, mail: &ResetMail) -> anyhow::Result<()> {
        info!(
            to = %mail.to,
            recipient = %mail.recipient,
            reset_url = %mail.reset_url,
            valid_minutes = mail.valid_minutes,
            "reset mail send stub"
        );
        Ok(())
    }
}
