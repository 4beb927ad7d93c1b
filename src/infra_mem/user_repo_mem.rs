use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::{StorageTx, UserRecord, UserRepo};
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Users {
    rows: Vec<UserRecord>,
    next_id: u64,
}

#[derive(Default)]
pub struct MemUserRepo {
    state: Mutex<Users>,
}

impl MemUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Users>, AuthError> {
        self.state
            .lock()
            .map_err(|_| AuthError::Store("user repo lock poisoned".into()))
    }
}

#[async_trait::async_trait]
impl UserRepo for MemUserRepo {
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        title: &str,
    ) -> Result<UserId, AuthError> {
        let mut state = self.lock()?;
        // the unique-constraint analogue
        if state.rows.iter().any(|u| u.email == email) {
            return Err(AuthError::EmailTaken);
        }
        state.next_id += 1;
        let user_id = UserId(state.next_id);
        let now = Utc::now();
        state.rows.push(UserRecord {
            user_id,
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            name: name.to_owned(),
            title: title.to_owned(),
            created_at: now,
            updated_at: now,
        });
        Ok(user_id)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let state = self.lock()?;
        Ok(state.rows.iter().find(|u| u.email == email).cloned())
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        let state = self.lock()?;
        Ok(state.rows.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let mut state = self.lock()?;
        match state.rows.iter_mut().find(|u| u.user_id == user_id) {
            Some(user) => {
                user.password_hash = password_hash.to_owned();
                user.updated_at = Utc::now();
                Ok(())
            }
            None => Err(AuthError::UserNotFound),
        }
    }

    async fn update_password_by_email_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        email: &str,
        password_hash: &str,
    ) -> Result<u64, AuthError> {
        let mut state = self.lock()?;
        let mut touched = 0;
        for user in state.rows.iter_mut().filter(|u| u.email == email) {
            user.password_hash = password_hash.to_owned();
            user.updated_at = Utc::now();
            touched += 1;
        }
        Ok(touched)
    }
}
