use crate::domain_port::{Mailer, ResetMail};
use std::sync::Mutex;

/// Keeps every mail it is handed; the test suites read tokens back out of
/// the recorded reset URLs.
#[derive(Default)]
pub struct RecordingMailer {
    outbox: Mutex<Vec<ResetMail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<ResetMail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send_reset(&self, mail: &ResetMail) -> anyhow::Result<()> {
        self.outbox
            .lock()
            .map_err(|_| anyhow::anyhow!("outbox lock poisoned"))?
            .push(mail.clone());
        Ok(())
    }
}
