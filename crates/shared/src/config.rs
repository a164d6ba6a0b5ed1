//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Balance update retry configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Run pending migrations on startup.
    #[serde(default)]
    pub auto_migrate: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Retry and backoff settings for optimistic balance updates.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Maximum attempts per balance update before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Linear backoff growth per attempt, in milliseconds.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
    /// Upper bound of the random jitter added to each delay, in milliseconds.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
    /// Cap applied to every backoff delay, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Optional overall time budget for one update call, in milliseconds.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

fn default_max_retries() -> u32 {
    6
}

fn default_backoff_step_ms() -> u64 {
    10
}

fn default_jitter_ms() -> u64 {
    20
}

fn default_max_backoff_ms() -> u64 {
    400
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_step_ms: default_backoff_step_ms(),
            jitter_ms: default_jitter_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            deadline_ms: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Environment variables use the `TALLY` prefix and `__` as separator,
    /// e.g. `TALLY__DATABASE__URL` or `TALLY__LEDGER__MAX_RETRIES`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_defaults_match_retry_constants() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.max_retries, 6);
        assert_eq!(ledger.backoff_step_ms, 10);
        assert_eq!(ledger.jitter_ms, 20);
        assert_eq!(ledger.max_backoff_ms, 400);
        assert_eq!(ledger.deadline_ms, None);
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("TALLY__DATABASE__URL", Some("postgres://localhost/tally_test")),
                ("TALLY__SERVER__PORT", Some("4000")),
                ("TALLY__LEDGER__MAX_RETRIES", Some("3")),
                ("RUN_MODE", Some("test-env-only")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/tally_test");
                assert_eq!(config.database.max_connections, 10);
                assert!(!config.database.auto_migrate);
                assert_eq!(config.server.port, 4000);
                assert_eq!(config.server.host, "0.0.0.0");
                assert_eq!(config.ledger.max_retries, 3);
                assert_eq!(config.ledger.max_backoff_ms, 400);
            },
        );
    }

    #[test]
    fn test_load_fails_without_database_url() {
        temp_env::with_vars(
            [
                ("TALLY__DATABASE__URL", None::<&str>),
                ("RUN_MODE", Some("test-env-only")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
