use super::util::downcast;
use crate::application_port::LedgerError;
use crate::domain_model::ResetToken;
use crate::domain_port::{ResetTokenRecord, ResetTokenRepo, StorageTx};
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlResetTokenRepo {
    pool: MySqlPool,
}

impl MySqlResetTokenRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlResetTokenRepo { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<ResetTokenRecord, LedgerError> {
        let email: String = row
            .try_get("email")
            .map_err(|e| LedgerError::Store(e.to_string()))?;
        let token: String = row
            .try_get("token")
            .map_err(|e| LedgerError::Store(e.to_string()))?;
        let expires_at: DateTime<Utc> = row
            .try_get("expires_at")
            .map_err(|e| LedgerError::Store(e.to_string()))?;
        let used: bool = row
            .try_get("used")
            .map_err(|e| LedgerError::Store(e.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        Ok(ResetTokenRecord {
            email,
            token,
            expires_at,
            used,
            created_at,
        })
    }
}

#[async_trait::async_trait]
impl ResetTokenRepo for MySqlResetTokenRepo {
    async fn purge_for_email_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
DELETE FROM password_reset_tokens
WHERE email = ? OR expires_at < ?
"#,
        )
        .bind(email)
        .bind(now)
        .execute(tx.conn())
        .await
        .map_err(|e| LedgerError::Store(e.to_string()))?;

        Ok(())
    }

    async fn insert_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        email: &str,
        token: &ResetToken,
        expires_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
INSERT INTO password_reset_tokens (email, token, expires_at)
VALUES (?, ?, ?)
"#,
        )
        .bind(email)
        .bind(token.as_str())
        .bind(expires_at)
        .execute(tx.conn())
        .await
        .map_err(|e| LedgerError::Store(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, token: &ResetToken) -> Result<Option<ResetTokenRecord>, LedgerError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT email, token, expires_at, used, created_at
FROM password_reset_tokens
WHERE token = ?
"#,
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn get_for_update_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        token: &ResetToken,
    ) -> Result<Option<ResetTokenRecord>, LedgerError> {
        let tx = downcast(tx);

        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT email, token, expires_at, used, created_at
FROM password_reset_tokens
WHERE token = ?
FOR UPDATE
"#,
        )
        .bind(token.as_str())
        .fetch_optional(tx.conn())
        .await
        .map_err(|e| LedgerError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn mark_used_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        token: &ResetToken,
    ) -> Result<(), LedgerError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
UPDATE password_reset_tokens
SET used = 1
WHERE token = ?
"#,
        )
        .bind(token.as_str())
        .execute(tx.conn())
        .await
        .map_err(|e| LedgerError::Store(e.to_string()))?;

        Ok(())
    }

    async fn delete_siblings_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        email: &str,
        token: &ResetToken,
    ) -> Result<(), LedgerError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
DELETE FROM password_reset_tokens
WHERE email = ? AND token <> ?
"#,
        )
        .bind(email)
        .bind(token.as_str())
        .execute(tx.conn())
        .await
        .map_err(|e| LedgerError::Store(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, token: &ResetToken) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
DELETE FROM password_reset_tokens
WHERE token = ?
"#,
        )
        .bind(token.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Store(e.to_string()))?;

        Ok(())
    }

    async fn delete_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        token: &ResetToken,
    ) -> Result<(), LedgerError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
DELETE FROM password_reset_tokens
WHERE token = ?
"#,
        )
        .bind(token.as_str())
        .execute(tx.conn())
        .await
        .map_err(|e| LedgerError::Store(e.to_string()))?;

        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, LedgerError> {
        let result = sqlx::query(
            r#"
DELETE FROM password_reset_tokens
WHERE expires_at < ?
"#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Store(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
