use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::password::{generate_password, hash_password, verify_password, DEFAULT_PASSWORD_LENGTH};
use crate::auth::repo_types::{NewUser, User, DEFAULT_ROLE};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username or email already exists")]
    DuplicateCredential,
    #[error("password hashing failed: {0:#}")]
    Hashing(anyhow::Error),
    #[error(transparent)]
    Unavailable(#[from] anyhow::Error),
}

/// Persistence of user credentials.
///
/// Lookups are keyed by the password itself, so `find_by_password` has to
/// verify the candidate against every stored hash.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user with a freshly generated password. The plaintext is
    /// returned once and never stored.
    async fn create_user(&self, new_user: &NewUser) -> Result<(Uuid, String), StoreError>;
    async fn find_by_password(&self, plaintext: &str) -> Result<Option<User>, StoreError>;
    async fn touch_last_login(&self, user_id: Uuid) -> Result<(), StoreError>;
}

/// Generate a password and its argon2 hash off the async executor.
pub(crate) async fn new_credential() -> anyhow::Result<(String, String)> {
    tokio::task::spawn_blocking(|| {
        let plain = generate_password(DEFAULT_PASSWORD_LENGTH);
        let hash = hash_password(&plain)?;
        Ok::<_, anyhow::Error>((plain, hash))
    })
    .await
    .context("password hashing task")?
}

/// Sequential scan of `candidates`, returning the first whose hash verifies.
/// Never truncated: every stored hash is a possible match.
pub(crate) async fn scan_for_password(
    candidates: Vec<User>,
    plaintext: &str,
    warn_threshold: usize,
) -> anyhow::Result<Option<User>> {
    if candidates.len() > warn_threshold {
        warn!(
            candidates = candidates.len(),
            threshold = warn_threshold,
            "password scan above threshold; login cost is linear in user count"
        );
    }
    let plaintext = plaintext.to_owned();
    tokio::task::spawn_blocking(move || first_match(candidates, &plaintext))
        .await
        .context("password scan task")
}

fn first_match(candidates: Vec<User>, plaintext: &str) -> Option<User> {
    candidates
        .into_iter()
        .find(|u| match verify_password(plaintext, &u.password_hash) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(user_id = %u.id, error = %e, "skipping malformed password hash");
                false
            }
        })
}

fn classify_insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::DuplicateCredential;
        }
    }
    StoreError::Unavailable(anyhow::Error::new(e).context("insert user"))
}

/// Postgres-backed store. Each operation holds one pooled connection for its
/// own duration; the connection goes back on drop, including on error paths.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
    scan_warn_threshold: usize,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, scan_warn_threshold: usize) -> Self {
        Self {
            pool,
            scan_warn_threshold,
        }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, new_user: &NewUser) -> Result<(Uuid, String), StoreError> {
        let (plain, hash) = new_credential().await.map_err(StoreError::Hashing)?;
        let id = Uuid::new_v4();

        let mut conn = self.pool.acquire().await.context("acquire connection")?;
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&hash)
        .bind(&new_user.full_name)
        .bind(DEFAULT_ROLE)
        .execute(&mut *conn)
        .await
        .map_err(classify_insert_error)?;

        debug!(user_id = %id, "user row inserted");
        Ok((id, plain))
    }

    async fn find_by_password(&self, plaintext: &str) -> Result<Option<User>, StoreError> {
        let users = {
            let mut conn = self.pool.acquire().await.context("acquire connection")?;
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, full_name, role, created_at, last_login
                FROM users
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .fetch_all(&mut *conn)
            .await
            .context("load users")?
        };

        Ok(scan_for_password(users, plaintext, self.scan_warn_threshold).await?)
    }

    async fn touch_last_login(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.context("acquire connection")?;
        sqlx::query(r#"UPDATE users SET last_login = now() WHERE id = $1"#)
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .context("update last_login")?;
        Ok(())
    }
}
