use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningConfig {
    pub url: Option<String>,
    pub timeout_secs: u64,
    pub context_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub db: DbConfig,
    pub reasoning: ReasoningConfig,
    pub host: String,
    pub port: u16,
    pub service_name: String,
    /// Number of stored hashes after which a login scan is reported as slow.
    pub auth_scan_warn_threshold: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let db = DbConfig {
            host: var_or("DB_HOST", "localhost"),
            port: parsed_or("DB_PORT", 5432),
            database: var_or("DB_DATABASE", "minemind"),
            user: var_or("DB_USER", "user"),
            password: var_or("DB_PASSWORD", "password"),
            max_connections: parsed_or("DB_MAX_CONNECTIONS", 5),
            acquire_timeout_secs: parsed_or("DB_ACQUIRE_TIMEOUT_SECS", 5),
        };
        let reasoning = ReasoningConfig {
            url: non_empty_var("REASONING_URL"),
            timeout_secs: parsed_or("REASONING_TIMEOUT_SECS", 60),
            context_url: non_empty_var("CONTEXT_URL"),
        };
        Ok(Self {
            db,
            reasoning,
            host: var_or("APP_HOST", "0.0.0.0"),
            port: parsed_or("PORT", 5000),
            service_name: var_or("SERVICE_NAME", "AI Mining Operations Co-Pilot"),
            auth_scan_warn_threshold: parsed_or("AUTH_SCAN_WARN_THRESHOLD", 10_000),
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
