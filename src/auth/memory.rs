use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::{new_credential, scan_for_password, CredentialStore, StoreError};
use crate::auth::repo_types::{NewUser, User, DEFAULT_ROLE};

/// Store used by tests. Unique constraints are checked under the lock so
/// concurrent duplicate registrations resolve the same way the database does.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: Mutex<Vec<User>>,
    unavailable: AtomicBool,
}

impl InMemoryCredentialStore {
    /// Make every subsequent operation fail as if the database were down.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create_user(&self, new_user: &NewUser) -> Result<(Uuid, String), StoreError> {
        self.check_available()?;
        let (plain, hash) = new_credential().await.map_err(StoreError::Hashing)?;

        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.username == new_user.username || u.email == new_user.email)
        {
            return Err(StoreError::DuplicateCredential);
        }
        let id = Uuid::new_v4();
        users.push(User {
            id,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: hash,
            full_name: new_user.full_name.clone(),
            role: DEFAULT_ROLE.into(),
            created_at: OffsetDateTime::now_utc(),
            last_login: None,
        });
        Ok((id, plain))
    }

    async fn find_by_password(&self, plaintext: &str) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        let candidates = self.snapshot();
        Ok(scan_for_password(candidates, plaintext, usize::MAX).await?)
    }

    async fn touch_last_login(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.check_available()?;
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.id == user_id) {
            u.last_login = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }
}
