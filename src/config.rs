//! Application configuration
//!
//! Loads configuration from environment variables with secure defaults.
//!
//! The JWT signing secret is deliberately *required* configuration: it must
//! be provisioned externally and survive restarts, otherwise every deploy
//! would invalidate all outstanding sessions.

use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Minimum accepted signing-secret length in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Database pool settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL (e.g. `sqlite://lectern.db`).
    pub url: String,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool.
    pub acquire_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://lectern.db".to_string(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl DatabaseConfig {
    /// Load pool settings from the environment.
    ///
    /// - `DATABASE_URL` (default: `sqlite://lectern.db`)
    /// - `DB_MAX_CONNECTIONS` (default: 10)
    /// - `DB_ACQUIRE_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let url = std::env::var("DATABASE_URL").unwrap_or(defaults.url);

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_connections);

        let acquire_timeout = std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.acquire_timeout);

        Self {
            url,
            max_connections,
            acquire_timeout,
        }
    }

    /// Ephemeral in-memory database.
    ///
    /// A single connection is mandatory here: every new SQLite `:memory:`
    /// connection opens its own blank database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address to listen on.
    pub bind_addr: String,

    /// JWT signing secret (externally provisioned, never generated at boot).
    pub jwt_secret: String,

    /// Lifetime of issued access tokens.
    pub token_ttl: Duration,

    /// Maximum scored attempts per user within the submission window.
    pub submission_limit: i64,

    /// Trailing window for the submission cap.
    pub submission_window: Duration,

    /// Request timeout applied at the router level.
    pub request_timeout: Duration,

    /// Maximum request body size in bytes.
    pub max_request_size: usize,

    /// CORS allowed origins. Empty = same-origin only, `["*"]` = any origin.
    pub cors_origins: Vec<String>,

    /// Database pool settings.
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Baseline configuration with the given signing secret and defaults
    /// everywhere else.
    ///
    /// Fails if the secret is shorter than [`MIN_JWT_SECRET_LEN`] bytes.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Result<Self> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!(
                "JWT_SECRET must be at least {} characters (got {})",
                MIN_JWT_SECRET_LEN,
                jwt_secret.len()
            );
        }

        Ok(Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            jwt_secret,
            token_ttl: Duration::from_secs(3600),
            submission_limit: 2,
            submission_window: Duration::from_secs(3600),
            request_timeout: Duration::from_secs(30),
            max_request_size: 1024 * 1024,
            cors_origins: Vec::new(),
            database: DatabaseConfig::default(),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `JWT_SECRET`: signing secret, required, min 32 characters
    /// - `BIND_ADDR`: listen address (default: `0.0.0.0:5000`)
    /// - `TOKEN_TTL_SECS`: access token lifetime (default: 3600)
    /// - `SUBMISSION_LIMIT`: attempts per window (default: 2)
    /// - `SUBMISSION_WINDOW_SECS`: window length (default: 3600)
    /// - `REQUEST_TIMEOUT_SECS`: per-request timeout (default: 30)
    /// - `MAX_REQUEST_SIZE`: body size limit in bytes (default: 1 MiB)
    /// - `CORS_ALLOWED_ORIGINS`: comma-separated allowlist, or `*`
    ///
    /// Plus the `DATABASE_URL` / `DB_*` variables of [`DatabaseConfig`].
    pub fn from_env() -> Result<Self> {
        let jwt_secret =
            std::env::var("JWT_SECRET").context("JWT_SECRET environment variable required")?;

        let mut config = Self::with_secret(jwt_secret)?;

        if let Ok(addr) = std::env::var("BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Some(secs) = std::env::var("TOKEN_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.token_ttl = Duration::from_secs(secs);
        }

        if let Some(limit) = std::env::var("SUBMISSION_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.submission_limit = limit;
        }

        if let Some(secs) = std::env::var("SUBMISSION_WINDOW_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.submission_window = Duration::from_secs(secs);
        }

        if let Some(secs) = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(size) = std::env::var("MAX_REQUEST_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.max_request_size = size;
        }

        if let Ok(origins) = std::env::var("CORS_ALLOWED_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        config.database = DatabaseConfig::from_env();

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn secret_length_is_enforced() {
        assert!(AppConfig::with_secret("too-short").is_err());
        assert!(AppConfig::with_secret(SECRET).is_ok());
    }

    #[test]
    fn defaults_match_the_submission_policy() {
        let config = AppConfig::with_secret(SECRET).unwrap();
        assert_eq!(config.submission_limit, 2);
        assert_eq!(config.submission_window, Duration::from_secs(3600));
        assert_eq!(config.token_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn in_memory_database_uses_a_single_connection() {
        let db = DatabaseConfig::in_memory();
        assert_eq!(db.max_connections, 1);
        assert!(db.url.contains(":memory:"));
    }
}
