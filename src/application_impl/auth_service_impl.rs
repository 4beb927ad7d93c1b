use crate::application_port::{
    AuthError, AuthService, ChangePasswordInput, CredentialHasher, LoginInput, LoginResult,
    RegisterInput, ResetPasswordInput, TokenLedger, UserProfile,
};
use crate::domain_model::{SessionId, UserId};
use crate::domain_port::{Mailer, ResetMail, SessionStore, UserRecord, UserRepo};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!("verify error: {e}"))),
        }
    }
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Prefix of the link mailed out; the token is appended as `?token=`.
    pub reset_base_url: String,
    pub session_ttl_secs: u64,
}

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    session_store: Arc<dyn SessionStore>,
    ledger: Arc<dyn TokenLedger>,
    mailer: Arc<dyn Mailer>,
    config: AuthConfig,
    min_password_len: usize,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        session_store: Arc<dyn SessionStore>,
        ledger: Arc<dyn TokenLedger>,
        mailer: Arc<dyn Mailer>,
        config: AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            session_store,
            ledger,
            mailer,
            config,
            min_password_len: 6,
        }
    }

    fn check_password_length(&self, password: &str) -> Result<(), AuthError> {
        if password.len() < self.min_password_len {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                self.min_password_len
            )));
        }
        Ok(())
    }

    fn profile_of(rec: UserRecord) -> UserProfile {
        UserProfile {
            id: rec.user_id,
            email: rec.email,
            name: rec.name,
            title: rec.title,
            created_at: rec.created_at,
        }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, input: RegisterInput) -> Result<UserProfile, AuthError> {
        let RegisterInput {
            email,
            password,
            confirm_password,
            name,
            title,
        } = input;

        let email = email.trim().to_lowercase();
        let name = name.trim().to_owned();
        let title = title.trim().to_owned();

        if email.is_empty() || password.is_empty() || name.is_empty() || title.is_empty() {
            return Err(AuthError::Validation("all fields are required".into()));
        }
        if !valid_email(&email) {
            return Err(AuthError::Validation("invalid email address".into()));
        }
        self.check_password_length(&password)?;
        if let Some(confirm) = confirm_password {
            if confirm != password {
                return Err(AuthError::Validation("passwords do not match".into()));
            }
        }

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        // no exists() pre-check: the unique constraint closes the race
        let user_id = self
            .user_repo
            .create(&email, &password_hash, &name, &title)
            .await?;

        let rec = self
            .user_repo
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::InternalError("freshly created user missing".into()))?;
        Ok(Self::profile_of(rec))
    }

    async fn login(&self, input: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { email, password } = input;

        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "email and password are required".into(),
            ));
        }
        let email = email.trim().to_lowercase();

        // unknown address and wrong password collapse into one answer
        let rec = self
            .user_repo
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let session = SessionId::generate();
        self.session_store
            .save(&session, rec.user_id, self.config.session_ttl_secs)
            .await?;

        Ok(LoginResult {
            session,
            user: Self::profile_of(rec),
        })
    }

    async fn logout(&self, session: &SessionId) -> Result<(), AuthError> {
        self.session_store.delete(session).await
    }

    async fn authenticate(&self, session: &SessionId) -> Result<UserId, AuthError> {
        self.session_store
            .get(session)
            .await?
            .ok_or(AuthError::NotAuthenticated)
    }

    async fn user_info(&self, session: &SessionId) -> Result<UserProfile, AuthError> {
        let user_id = self.authenticate(session).await?;
        match self.user_repo.get_by_id(user_id).await? {
            Some(rec) => Ok(Self::profile_of(rec)),
            None => {
                // session pointing at a vanished row: tear it down
                let _ = self.session_store.delete(session).await;
                Err(AuthError::NotAuthenticated)
            }
        }
    }

    async fn change_password(
        &self,
        user_id: UserId,
        input: ChangePasswordInput,
    ) -> Result<(), AuthError> {
        let ChangePasswordInput {
            current_password,
            new_password,
            confirm_new_password,
        } = input;

        if current_password.is_empty() || new_password.is_empty() || confirm_new_password.is_empty()
        {
            return Err(AuthError::Validation("all fields are required".into()));
        }
        if new_password != confirm_new_password {
            return Err(AuthError::Validation("new passwords do not match".into()));
        }
        self.check_password_length(&new_password)?;
        if current_password == new_password {
            return Err(AuthError::Validation(
                "new password must differ from the current password".into(),
            ));
        }

        let rec = self
            .user_repo
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let ok = self
            .credential_hasher
            .verify_password(&current_password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::WrongPassword);
        }

        let new_hash = self.credential_hasher.hash_password(&new_password).await?;
        self.user_repo.update_password(user_id, &new_hash).await?;
        Ok(())
    }

    async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim().to_lowercase();
        if !valid_email(&email) {
            return Err(AuthError::Validation("invalid email address".into()));
        }

        match self.ledger.issue(&email).await? {
            Some(issued) => {
                let reset_url = format!(
                    "{}?token={}",
                    self.config.reset_base_url,
                    issued.token.as_str()
                );
                let mail = ResetMail {
                    to: issued.email.clone(),
                    recipient: issued.recipient,
                    reset_url,
                    valid_minutes: (issued.expires_at - Utc::now()).num_minutes(),
                };
                // delivery failures stay server-side; the response shape
                // must not depend on them
                if let Err(e) = self.mailer.send_reset(&mail).await {
                    warn!("reset mail to {} failed: {e:#}", issued.email);
                }
            }
            None => {
                debug!("password reset requested for unknown email");
            }
        }
        Ok(())
    }

    async fn validate_reset_token(&self, token: &str) -> Result<String, AuthError> {
        Ok(self.ledger.validate(token).await?)
    }

    async fn reset_password(&self, input: ResetPasswordInput) -> Result<(), AuthError> {
        let ResetPasswordInput {
            token,
            new_password,
            confirm_new_password,
        } = input;

        if token.is_empty() || new_password.is_empty() || confirm_new_password.is_empty() {
            return Err(AuthError::Validation("all fields are required".into()));
        }
        if new_password != confirm_new_password {
            return Err(AuthError::Validation("new passwords do not match".into()));
        }
        self.check_password_length(&new_password)?;

        let new_hash = self.credential_hasher.hash_password(&new_password).await?;
        self.ledger.consume(&token, &new_hash).await?;
        Ok(())
    }
}
