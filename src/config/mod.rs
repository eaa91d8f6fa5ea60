//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `LUMOS_ACCESS_` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use lumos_access::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod cloudpayments;
mod database;
mod entitlement;
mod error;
mod server;
mod telegram;
mod unisender;
mod webhooks;

pub use cloudpayments::CloudPaymentsConfig;
pub use database::{DatabaseConfig, StorageBackend, StorageConfig};
pub use entitlement::EntitlementConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use telegram::TelegramConfig;
pub use unisender::UniSenderConfig;
pub use webhooks::WebhooksConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Entitlement store selection
    #[serde(default)]
    pub storage: StorageConfig,

    /// Recurring-billing provider
    pub cloudpayments: CloudPaymentsConfig,

    /// Mailing-list service
    pub unisender: UniSenderConfig,

    /// Admin notification channel
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Webhook route secrets
    pub webhooks: WebhooksConfig,

    /// Entitlement policy
    #[serde(default)]
    pub entitlement: EntitlementConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `LUMOS_ACCESS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `LUMOS_ACCESS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `LUMOS_ACCESS__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("LUMOS_ACCESS")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// The database section is only checked when the Postgres backend is selected.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if self.storage.backend == StorageBackend::Postgres {
            self.database.validate()?;
            if self.database.lock_timeout() >= self.server.request_timeout() {
                return Err(ValidationError::InvalidLockTimeout);
            }
        }
        self.cloudpayments.validate()?;
        self.unisender.validate()?;
        self.telegram.validate()?;
        self.webhooks.validate()?;
        self.entitlement.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const MINIMAL: &[(&str, &str)] = &[
        ("LUMOS_ACCESS__DATABASE__URL", "postgresql://test@localhost/test"),
        ("LUMOS_ACCESS__CLOUDPAYMENTS__PUBLIC_ID", "pk_test"),
        ("LUMOS_ACCESS__CLOUDPAYMENTS__API_SECRET", "secret"),
        ("LUMOS_ACCESS__UNISENDER__API_KEY", "unisender-key"),
        ("LUMOS_ACCESS__WEBHOOKS__TRIAL_ROUTE_HASH", "trial-hash"),
        ("LUMOS_ACCESS__WEBHOOKS__PRODAMUS_ROUTE_HASH", "prodamus-hash"),
        ("LUMOS_ACCESS__WEBHOOKS__CLOUDPAYMENTS_PAY_ROUTE_HASH", "cp-pay-hash"),
        ("LUMOS_ACCESS__WEBHOOKS__CLOUDPAYMENTS_RECURRENT_ROUTE_HASH", "cp-rec-hash"),
        ("LUMOS_ACCESS__WEBHOOKS__PROJECT_ID", "42"),
    ];

    const OPTIONAL: &[&str] = &[
        "LUMOS_ACCESS__SERVER__PORT",
        "LUMOS_ACCESS__SERVER__ENVIRONMENT",
        "LUMOS_ACCESS__STORAGE__BACKEND",
        "LUMOS_ACCESS__DATABASE__LOCK_TIMEOUT_MS",
    ];

    fn set_minimal_env() {
        for (key, value) in MINIMAL {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in MINIMAL {
            env::remove_var(key);
        }
        for key in OPTIONAL {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.cloudpayments.public_id, "pk_test");
        assert_eq!(config.webhooks.project_id, "42");
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.entitlement.default_trial_days, 14);
        assert!(config.telegram.credentials().is_none());
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("LUMOS_ACCESS__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().is_production());
    }

    #[test]
    fn test_memory_backend_skips_database_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::remove_var("LUMOS_ACCESS__DATABASE__URL");
        env::set_var("LUMOS_ACCESS__STORAGE__BACKEND", "memory");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lock_timeout_must_fit_in_request_timeout() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("LUMOS_ACCESS__DATABASE__LOCK_TIMEOUT_MS", "120000");
        let result = AppConfig::load();
        clear_env();

        assert_eq!(
            result.unwrap().validate(),
            Err(ValidationError::InvalidLockTimeout)
        );
    }
}
