use crate::application_port::LedgerError;
use crate::domain_model::ResetToken;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ResetTokenRecord {
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait ResetTokenRepo: Send + Sync {
    /// Drop every token for `email`, plus anything already expired at `now`.
    async fn purge_for_email_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError>;

    async fn insert_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        email: &str,
        token: &ResetToken,
        expires_at: DateTime<Utc>,
    ) -> Result<(), LedgerError>;

    async fn get(&self, token: &ResetToken) -> Result<Option<ResetTokenRecord>, LedgerError>;

    /// Row-locked read; the `used`/expiry checks that follow must observe
    /// the row under this lock.
    async fn get_for_update_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        token: &ResetToken,
    ) -> Result<Option<ResetTokenRecord>, LedgerError>;

    async fn mark_used_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        token: &ResetToken,
    ) -> Result<(), LedgerError>;

    /// Delete every other token issued for `email`.
    async fn delete_siblings_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        email: &str,
        token: &ResetToken,
    ) -> Result<(), LedgerError>;

    async fn delete(&self, token: &ResetToken) -> Result<(), LedgerError>;

    async fn delete_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        token: &ResetToken,
    ) -> Result<(), LedgerError>;

    /// Returns how many rows were purged.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, LedgerError>;
}
