//! Configuration for the gateway API service.

use std::time::Duration;

use hermes_auth_core::RateLimitConfig;
use hermes_campaign_core::DispatcherConfig;

/// Gateway API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub port: u16,

    /// Database URL assembled from the `DB_*` variables
    pub database_url: String,

    /// Upstream WhatsApp server base URL
    pub wa_server_url: String,

    /// Upstream admin credential
    pub wa_admin_token: String,

    /// Raw `INTERNAL_API_KEYS` value (comma-separated, `source:secret` scoped)
    pub internal_api_keys: String,

    /// Subscription provider label
    pub provider: String,

    /// Optional verification token for webhook subscription echoes
    pub webhook_verify_token: Option<String>,

    /// Public-surface rate limiting
    pub rate_limit: RateLimitConfig,

    /// Campaign dispatcher tuning
    pub dispatcher: DispatcherConfig,

    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env_parse("PORT", 8070)?;

        // Primary store
        let db_host = std::env::var("DB_HOST").map_err(|_| ConfigError::Missing("DB_HOST"))?;
        let db_port = std::env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_user = std::env::var("DB_USER").map_err(|_| ConfigError::Missing("DB_USER"))?;
        let db_password =
            std::env::var("DB_PASSWORD").map_err(|_| ConfigError::Missing("DB_PASSWORD"))?;
        let db_name = std::env::var("DB_NAME").map_err(|_| ConfigError::Missing("DB_NAME"))?;
        let db_sslmode = std::env::var("DB_SSLMODE").unwrap_or_else(|_| "disable".to_string());

        let database_url = format!(
            "postgres://{db_user}:{db_password}@{db_host}:{db_port}/{db_name}?sslmode={db_sslmode}"
        );

        let wa_server_url =
            std::env::var("WA_SERVER_URL").map_err(|_| ConfigError::Missing("WA_SERVER_URL"))?;
        let wa_admin_token = std::env::var("WA_ADMIN_TOKEN").unwrap_or_default();
        let internal_api_keys = std::env::var("INTERNAL_API_KEYS").unwrap_or_default();

        let provider =
            std::env::var("WA_PROVIDER").unwrap_or_else(|_| "hermes-wa".to_string());
        let webhook_verify_token = std::env::var("WEBHOOK_VERIFY_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let rate_limit = RateLimitConfig {
            window_seconds: env_parse("PUBLIC_RATE_LIMIT_WINDOW_SECONDS", 60)?,
            max_per_window: env_parse("PUBLIC_RATE_LIMIT_MAX_REQUEST", 120)?,
            spam_max_per_10s: env_parse("PUBLIC_SPAM_MAX_PER_10S", 40)?,
            block_minutes: env_parse("PUBLIC_SPAM_BLOCK_MINUTES", 10)?,
        };

        let dispatcher = DispatcherConfig {
            pacing: Duration::from_secs(env_parse("CAMPAIGN_PACING_SECONDS", 2)?),
            failure_guard: env_parse("CAMPAIGN_FAILURE_GUARD", 10)?,
            ..DispatcherConfig::default()
        };

        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Self {
            port,
            database_url,
            wa_server_url,
            wa_admin_token,
            internal_api_keys,
            provider,
            webhook_verify_token,
            rate_limit,
            dispatcher,
            metrics_enabled,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::Invalid(key))
        }
        _ => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
