use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_mem::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::server::Sweeper;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Backends {
    user_repo: Arc<dyn UserRepo>,
    reset_repo: Arc<dyn ResetTokenRepo>,
    tx_manager: Arc<dyn TxManager>,
    captcha_store: Arc<dyn CaptchaStore>,
    session_store: Arc<dyn SessionStore>,
    pool: Option<Pool<MySql>>,
}

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub captcha_service: Arc<dyn CaptchaService>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let backends = Self::storage_backends(settings).await?;

        let captcha_service: Arc<dyn CaptchaService> = match settings.captcha.backend.as_str() {
            "fake" => Arc::new(FakeCaptchaService::new()),
            "real" => Arc::new(RealCaptchaService::new(
                backends.captcha_store.clone(),
                settings.captcha.hmac_key.clone().into_bytes(),
            )),
            other => return Err(anyhow::anyhow!("Unknown captcha backend: {}", other)),
        };

        let mailer: Arc<dyn Mailer> = match settings.mail.backend.as_str() {
            "log" => Arc::new(LogMailer::new()),
            other => return Err(anyhow::anyhow!("Unknown mail backend: {}", other)),
        };

        let ledger: Arc<dyn TokenLedger> = Arc::new(RealTokenLedger::new(
            backends.user_repo.clone(),
            backends.reset_repo.clone(),
            backends.tx_manager.clone(),
            settings.reset.token_ttl_minutes,
        ));

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher {});
        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            backends.user_repo.clone(),
            credential_hasher,
            backends.session_store.clone(),
            ledger,
            mailer,
            AuthConfig {
                reset_base_url: settings.reset.base_url.clone(),
                session_ttl_secs: settings.auth.session_ttl_secs,
            },
        ));

        let cancel = CancellationToken::new();
        let sweeper = Sweeper::new(
            backends.reset_repo.clone(),
            cancel.clone(),
            Duration::from_secs(settings.reset.sweep_interval_secs),
        );
        let sweeper_handle = tokio::spawn(async move {
            let _ = sweeper.run().await;
        });

        info!("server started");

        Ok(Self {
            auth_service,
            captcha_service,
            sweeper_handle: Mutex::new(Some(sweeper_handle)),
            cancel,
            pool: backends.pool,
        })
    }

    /// Wiring for callers that bring their own services; the test suites
    /// pair this with the memory backends.
    pub fn with_services(
        auth_service: Arc<dyn AuthService>,
        captcha_service: Arc<dyn CaptchaService>,
    ) -> Self {
        Self {
            auth_service,
            captcha_service,
            sweeper_handle: Mutex::new(None),
            cancel: CancellationToken::new(),
            pool: None,
        }
    }

    async fn storage_backends(settings: &Settings) -> anyhow::Result<Backends> {
        match settings.storage.backend.as_str() {
            "mysql" => {
                let mysql_url = settings
                    .storage
                    .mysql_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("storage.mysql_url is required for mysql"))?;
                let redis_url = settings
                    .storage
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("storage.redis_url is required for mysql"))?;

                let pool = Pool::<MySql>::connect(mysql_url).await?;
                sqlx::migrate!("./migrations").run(&pool).await?;

                let redis_client = redis::Client::open(redis_url)?;
                let redis_manager = redis_client.get_connection_manager().await?;

                Ok(Backends {
                    user_repo: Arc::new(MySqlUserRepo::new(pool.clone())),
                    reset_repo: Arc::new(MySqlResetTokenRepo::new(pool.clone())),
                    tx_manager: Arc::new(MySqlTxManager::new(pool.clone())),
                    captcha_store: Arc::new(RedisCaptchaStore::new(
                        redis_manager.clone(),
                        "captcha".to_string(),
                    )),
                    session_store: Arc::new(RedisSessionStore::new(redis_manager, "session")),
                    pool: Some(pool),
                })
            }
            "memory" => Ok(Backends {
                user_repo: Arc::new(MemUserRepo::new()),
                reset_repo: Arc::new(MemResetTokenRepo::new()),
                tx_manager: Arc::new(MemTxManager::new()),
                captcha_store: Arc::new(MemCaptchaStore::new()),
                session_store: Arc::new(MemSessionStore::new()),
                pool: None,
            }),
            other => Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        if let Ok(mut lock) = self.sweeper_handle.lock() {
            if let Some(handle) = lock.take() {
                let r = handle.await;
                info!("sweeper handle dropped: {:?}", r);
            }
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
