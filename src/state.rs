use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::auth::repo::{CredentialStore, PgCredentialStore};
use crate::config::AppConfig;
use crate::db;
use crate::query::clients::{
    HttpContextProvider, HttpReasoningEngine, StaticContextProvider, UnconfiguredReasoningEngine,
};
use crate::query::services::{ContextProvider, ReasoningEngine};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credentials: Arc<dyn CredentialStore>,
    pub context: Arc<dyn ContextProvider>,
    pub reasoning: Arc<dyn ReasoningEngine>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = db::lazy_pool(&config.db);
        match db::ensure_schema(&pool).await {
            Ok(()) => info!("users table ready"),
            Err(e) => warn!(error = %format!("{e:#}"), "schema bootstrap failed; continuing"),
        }
        let credentials = Arc::new(PgCredentialStore::new(
            pool,
            config.auth_scan_warn_threshold,
        )) as Arc<dyn CredentialStore>;

        let timeout = Duration::from_secs(config.reasoning.timeout_secs);
        let reasoning: Arc<dyn ReasoningEngine> = match &config.reasoning.url {
            Some(url) => Arc::new(HttpReasoningEngine::new(url, timeout)?),
            None => {
                warn!("REASONING_URL not set; /api/query will fail");
                Arc::new(UnconfiguredReasoningEngine)
            }
        };
        let context: Arc<dyn ContextProvider> = match &config.reasoning.context_url {
            Some(url) => Arc::new(HttpContextProvider::new(url, timeout)?),
            None => Arc::new(StaticContextProvider),
        };

        Ok(Self::from_parts(config, credentials, context, reasoning))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        credentials: Arc<dyn CredentialStore>,
        context: Arc<dyn ContextProvider>,
        reasoning: Arc<dyn ReasoningEngine>,
    ) -> Self {
        Self {
            config,
            credentials,
            context,
            reasoning,
        }
    }

    /// State backed by an in-memory credential store and canned collaborators.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::auth::memory::InMemoryCredentialStore;
        use crate::config::{DbConfig, ReasoningConfig};
        use crate::query::services::fakes::{CountingEngine, FixedContext};

        let config = Arc::new(AppConfig {
            db: DbConfig {
                host: "localhost".into(),
                port: 5432,
                database: "minemind".into(),
                user: "test".into(),
                password: "test".into(),
                max_connections: 1,
                acquire_timeout_secs: 1,
            },
            reasoning: ReasoningConfig {
                url: None,
                timeout_secs: 5,
                context_url: None,
            },
            host: "127.0.0.1".into(),
            port: 0,
            service_name: "test-service".into(),
            auth_scan_warn_threshold: 100,
        });

        Self::from_parts(
            config,
            Arc::new(InMemoryCredentialStore::default()),
            Arc::new(FixedContext(serde_json::json!({"sites": []}))),
            Arc::new(CountingEngine::default()),
        )
    }
}
