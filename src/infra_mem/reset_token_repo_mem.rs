use crate::application_port::LedgerError;
use crate::domain_model::ResetToken;
use crate::domain_port::{ResetTokenRecord, ResetTokenRepo, StorageTx};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
pub struct MemResetTokenRepo {
    state: Mutex<Vec<ResetTokenRecord>>,
}

impl MemResetTokenRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<ResetTokenRecord>>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Store("reset token repo lock poisoned".into()))
    }
}

#[async_trait::async_trait]
impl ResetTokenRepo for MemResetTokenRepo {
    async fn purge_for_email_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        state.retain(|rec| rec.email != email && rec.expires_at >= now);
        Ok(())
    }

    async fn insert_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        email: &str,
        token: &ResetToken,
        expires_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        state.push(ResetTokenRecord {
            email: email.to_owned(),
            token: token.as_str().to_owned(),
            expires_at,
            used: false,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn get(&self, token: &ResetToken) -> Result<Option<ResetTokenRecord>, LedgerError> {
        let state = self.lock()?;
        Ok(state.iter().find(|rec| rec.token == token.as_str()).cloned())
    }

    async fn get_for_update_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        token: &ResetToken,
    ) -> Result<Option<ResetTokenRecord>, LedgerError> {
        // the tx gate serializes callers, which is this backend's row lock
        let state = self.lock()?;
        Ok(state.iter().find(|rec| rec.token == token.as_str()).cloned())
    }

    async fn mark_used_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        token: &ResetToken,
    ) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        for rec in state.iter_mut().filter(|rec| rec.token == token.as_str()) {
            rec.used = true;
        }
        Ok(())
    }

    async fn delete_siblings_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        email: &str,
        token: &ResetToken,
    ) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        state.retain(|rec| rec.email != email || rec.token == token.as_str());
        Ok(())
    }

    async fn delete(&self, token: &ResetToken) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        state.retain(|rec| rec.token != token.as_str());
        Ok(())
    }

    async fn delete_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        token: &ResetToken,
    ) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        state.retain(|rec| rec.token != token.as_str());
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, LedgerError> {
        let mut state = self.lock()?;
        let before = state.len();
        state.retain(|rec| rec.expires_at >= now);
        Ok((before - state.len()) as u64)
    }
}
