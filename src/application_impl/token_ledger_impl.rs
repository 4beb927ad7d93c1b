use crate::application_port::{IssuedReset, LedgerError, TokenLedger};
use crate::domain_model::ResetToken;
use crate::domain_port::{ResetTokenRepo, TxManager, UserRepo};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

pub struct RealTokenLedger {
    user_repo: Arc<dyn UserRepo>,
    reset_repo: Arc<dyn ResetTokenRepo>,
    tx_manager: Arc<dyn TxManager>,
    token_ttl: Duration,
}

impl RealTokenLedger {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        reset_repo: Arc<dyn ResetTokenRepo>,
        tx_manager: Arc<dyn TxManager>,
        token_ttl_minutes: i64,
    ) -> Self {
        Self {
            user_repo,
            reset_repo,
            tx_manager,
            token_ttl: Duration::minutes(token_ttl_minutes),
        }
    }
}

#[async_trait::async_trait]
impl TokenLedger for RealTokenLedger {
    async fn issue(&self, email: &str) -> Result<Option<IssuedReset>, LedgerError> {
        let user = match self
            .user_repo
            .get_by_email(email)
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?
        {
            Some(user) => user,
            // unknown address: the caller answers as if a token went out
            None => return Ok(None),
        };

        let token = ResetToken::generate();
        let expires_at = Utc::now() + self.token_ttl;

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        self.reset_repo
            .purge_for_email_in_tx(&mut *tx, email, Utc::now())
            .await?;
        self.reset_repo
            .insert_in_tx(&mut *tx, email, &token, expires_at)
            .await?;

        tx.commit()
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        info!("reset token {}… issued for {}", token.abbrev(), email);

        let recipient = if user.name.trim().is_empty() {
            user.email.clone()
        } else {
            user.name
        };
        Ok(Some(IssuedReset {
            token,
            email: user.email,
            recipient,
            expires_at,
        }))
    }

    async fn validate(&self, token: &str) -> Result<String, LedgerError> {
        let token = ResetToken::parse(token).map_err(|_| LedgerError::NotFound)?;

        let rec = self
            .reset_repo
            .get(&token)
            .await?
            .ok_or(LedgerError::NotFound)?;

        if rec.used {
            return Err(LedgerError::AlreadyUsed);
        }
        if rec.expires_at <= Utc::now() {
            if let Err(e) = self.reset_repo.delete(&token).await {
                warn!("purging expired reset token {}…: {}", token.abbrev(), e);
            }
            return Err(LedgerError::Expired);
        }

        Ok(rec.email)
    }

    async fn consume(&self, token: &str, new_password_hash: &str) -> Result<(), LedgerError> {
        let token = ResetToken::parse(token).map_err(|_| LedgerError::NotFound)?;

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        // the used/expiry checks must see the row under the lock, or two
        // racing consumers could both pass
        let rec = self
            .reset_repo
            .get_for_update_in_tx(&mut *tx, &token)
            .await?
            .ok_or(LedgerError::NotFound)?;

        if rec.used {
            return Err(LedgerError::AlreadyUsed);
        }
        if rec.expires_at <= Utc::now() {
            self.reset_repo.delete_in_tx(&mut *tx, &token).await?;
            tx.commit()
                .await
                .map_err(|e| LedgerError::Store(e.to_string()))?;
            return Err(LedgerError::Expired);
        }

        let touched = self
            .user_repo
            .update_password_by_email_in_tx(&mut *tx, &rec.email, new_password_hash)
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?;
        if touched == 0 {
            return Err(LedgerError::UserNotFound);
        }

        self.reset_repo.mark_used_in_tx(&mut *tx, &token).await?;
        self.reset_repo
            .delete_siblings_in_tx(&mut *tx, &rec.email, &token)
            .await?;

        tx.commit()
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        info!("reset token {}… consumed for {}", token.abbrev(), rec.email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_port::{ResetTokenRecord, StorageTx};
    use crate::infra_mem::{MemResetTokenRepo, MemTxManager, MemUserRepo};
    use chrono::{DateTime, Utc};

    const EMAIL: &str = "a@x.com";

    struct Fixture {
        ledger: RealTokenLedger,
        user_repo: Arc<MemUserRepo>,
        reset_repo: Arc<MemResetTokenRepo>,
        tx_manager: Arc<MemTxManager>,
    }

    async fn fixture() -> Fixture {
        let user_repo = Arc::new(MemUserRepo::new());
        let reset_repo = Arc::new(MemResetTokenRepo::new());
        let tx_manager = Arc::new(MemTxManager::new());
        user_repo
            .create(EMAIL, "hash-0", "Ada", "Prof.")
            .await
            .unwrap();
        let ledger = RealTokenLedger::new(
            user_repo.clone(),
            reset_repo.clone(),
            tx_manager.clone(),
            30,
        );
        Fixture {
            ledger,
            user_repo,
            reset_repo,
            tx_manager,
        }
    }

    async fn insert_raw(
        f: &Fixture,
        email: &str,
        token: &ResetToken,
        expires_at: DateTime<Utc>,
    ) {
        let mut tx = f.tx_manager.begin().await.unwrap();
        f.reset_repo
            .insert_in_tx(&mut *tx, email, token, expires_at)
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn issue_for_unknown_email_returns_none() {
        let f = fixture().await;
        let issued = f.ledger.issue("nobody@x.com").await.unwrap();
        assert!(issued.is_none());
    }

    #[tokio::test]
    async fn issue_invalidates_previous_tokens() {
        let f = fixture().await;
        let first = f.ledger.issue(EMAIL).await.unwrap().unwrap();
        let second = f.ledger.issue(EMAIL).await.unwrap().unwrap();
        assert_ne!(first.token, second.token);

        let old = f.ledger.validate(first.token.as_str()).await;
        assert!(matches!(old, Err(LedgerError::NotFound)));

        let email = f.ledger.validate(second.token.as_str()).await.unwrap();
        assert_eq!(email, EMAIL);
    }

    #[tokio::test]
    async fn malformed_tokens_never_reach_the_store() {
        let user_repo = Arc::new(MemUserRepo::new());
        let tx_manager = Arc::new(MemTxManager::new());
        // a repo that panics on any access proves the lookup is skipped
        struct UnreachableRepo;
        #[async_trait::async_trait]
        impl ResetTokenRepo for UnreachableRepo {
            async fn purge_for_email_in_tx<'t>(
                &self,
                _: &mut dyn StorageTx<'t>,
                _: &str,
                _: DateTime<Utc>,
            ) -> Result<(), LedgerError> {
                unreachable!()
            }
            async fn insert_in_tx<'t>(
                &self,
                _: &mut dyn StorageTx<'t>,
                _: &str,
                _: &ResetToken,
                _: DateTime<Utc>,
            ) -> Result<(), LedgerError> {
                unreachable!()
            }
            async fn get(&self, _: &ResetToken) -> Result<Option<ResetTokenRecord>, LedgerError> {
                unreachable!()
            }
            async fn get_for_update_in_tx<'t>(
                &self,
                _: &mut dyn StorageTx<'t>,
                _: &ResetToken,
            ) -> Result<Option<ResetTokenRecord>, LedgerError> {
                unreachable!()
            }
            async fn mark_used_in_tx<'t>(
                &self,
                _: &mut dyn StorageTx<'t>,
                _: &ResetToken,
            ) -> Result<(), LedgerError> {
                unreachable!()
            }
            async fn delete_siblings_in_tx<'t>(
                &self,
                _: &mut dyn StorageTx<'t>,
                _: &str,
                _: &ResetToken,
            ) -> Result<(), LedgerError> {
                unreachable!()
            }
            async fn delete(&self, _: &ResetToken) -> Result<(), LedgerError> {
                unreachable!()
            }
            async fn delete_in_tx<'t>(
                &self,
                _: &mut dyn StorageTx<'t>,
                _: &ResetToken,
            ) -> Result<(), LedgerError> {
                unreachable!()
            }
            async fn delete_expired(&self, _: DateTime<Utc>) -> Result<u64, LedgerError> {
                unreachable!()
            }
        }

        let ledger =
            RealTokenLedger::new(user_repo, Arc::new(UnreachableRepo), tx_manager, 30);

        for bad in ["", "deadbeef", &"z".repeat(64), &"a".repeat(65)] {
            let validated = ledger.validate(bad).await;
            assert!(matches!(validated, Err(LedgerError::NotFound)));
            let consumed = ledger.consume(bad, "hash-1").await;
            assert!(matches!(consumed, Err(LedgerError::NotFound)));
        }
    }

    #[tokio::test]
    async fn expired_token_is_rejected_and_purged() {
        let f = fixture().await;
        let token = ResetToken::generate();
        insert_raw(&f, EMAIL, &token, Utc::now() - Duration::minutes(1)).await;

        let first = f.ledger.validate(token.as_str()).await;
        assert!(matches!(first, Err(LedgerError::Expired)));

        // opportunistically deleted on detection
        let second = f.ledger.validate(token.as_str()).await;
        assert!(matches!(second, Err(LedgerError::NotFound)));
    }

    #[tokio::test]
    async fn expired_token_cannot_be_consumed() {
        let f = fixture().await;
        let token = ResetToken::generate();
        insert_raw(&f, EMAIL, &token, Utc::now() - Duration::minutes(1)).await;

        let result = f.ledger.consume(token.as_str(), "hash-1").await;
        assert!(matches!(result, Err(LedgerError::Expired)));

        let user = f.user_repo.get_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(user.password_hash, "hash-0");
    }

    #[tokio::test]
    async fn consume_updates_the_password_once() {
        let f = fixture().await;
        let issued = f.ledger.issue(EMAIL).await.unwrap().unwrap();

        f.ledger
            .consume(issued.token.as_str(), "hash-1")
            .await
            .unwrap();
        let user = f.user_repo.get_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(user.password_hash, "hash-1");

        let again = f.ledger.consume(issued.token.as_str(), "hash-2").await;
        assert!(matches!(again, Err(LedgerError::AlreadyUsed)));
        let user = f.user_repo.get_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(user.password_hash, "hash-1");
    }

    #[tokio::test]
    async fn racing_consumers_get_exactly_one_success() {
        let f = fixture().await;
        let issued = f.ledger.issue(EMAIL).await.unwrap().unwrap();
        let token = issued.token.as_str();

        let (a, b) = tokio::join!(
            f.ledger.consume(token, "hash-a"),
            f.ledger.consume(token, "hash-b"),
        );

        let oks = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(oks, 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(LedgerError::AlreadyUsed)));
    }

    #[tokio::test]
    async fn consume_drops_sibling_tokens() {
        let f = fixture().await;
        let survivor = ResetToken::generate();
        let sibling = ResetToken::generate();
        let expires = Utc::now() + Duration::minutes(30);
        insert_raw(&f, EMAIL, &survivor, expires).await;
        insert_raw(&f, EMAIL, &sibling, expires).await;

        f.ledger.consume(survivor.as_str(), "hash-1").await.unwrap();

        let gone = f.ledger.validate(sibling.as_str()).await;
        assert!(matches!(gone, Err(LedgerError::NotFound)));
    }
}
