use std::time::Duration;

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

use crate::config::DbConfig;

pub fn connect_options(cfg: &DbConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .database(&cfg.database)
        .username(&cfg.user)
        .password(&cfg.password)
}

/// Lazily connected pool; nothing is dialled until the first operation, so the
/// service starts even while the database is down. Acquisition gives up after
/// `acquire_timeout_secs`.
pub fn lazy_pool(cfg: &DbConfig) -> PgPool {
    PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .connect_lazy_with(connect_options(cfg))
}

/// Idempotent bootstrap of the `users` table.
///
/// The prefix index over `password_hash` is never used for matching: salted
/// hashes can only be compared by full verification.
pub async fn ensure_schema(db: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            UUID PRIMARY KEY,
            username      VARCHAR(100) NOT NULL UNIQUE,
            email         VARCHAR(100) NOT NULL UNIQUE,
            password_hash VARCHAR(255) NOT NULL,
            full_name     VARCHAR(200) NOT NULL,
            role          VARCHAR(50)  NOT NULL DEFAULT 'user',
            created_at    TIMESTAMPTZ  NOT NULL DEFAULT now(),
            last_login    TIMESTAMPTZ  NULL
        )
        "#,
    )
    .execute(db)
    .await
    .context("create users table")?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_users_password_prefix
            ON users (left(password_hash, 50))
        "#,
    )
    .execute(db)
    .await
    .context("create password prefix index")?;

    Ok(())
}
