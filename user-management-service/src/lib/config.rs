use std::env;
use std::time::Duration;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

const MAX_IN_FLIGHT_LIMIT: usize = 4096;

/// Application configuration for user-management-service.
///
/// Loaded from configuration files with environment variable overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub env: Env,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub broker: BrokerConfig,
    pub token: TokenConfig,
}

/// Deployment environment; selects the log output format.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    Local,
    Dev,
    Prod,
}

/// HTTP server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    /// Deadline applied to every request
    pub request_timeout_secs: u64,
    /// Time allowed for in-flight requests and queued events after a shutdown signal
    pub shutdown_timeout_secs: u64,
}

/// PostgreSQL database configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// Session cache configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Redis connection URL (ignored by the memory backend)
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BrokerBackend {
    Kafka,
    Log,
}

/// Event broker configuration.
///
/// Used for publishing authentication events.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerConfig {
    pub backend: BrokerBackend,
    #[serde(default)]
    pub brokers: String,
    pub topic: String,
    /// Capacity of the in-process queue feeding the background publisher
    pub queue_capacity: usize,
    /// Deliveries the background publisher keeps in flight at once
    pub max_in_flight: usize,
    pub message_timeout_ms: u64,
}

/// Access token configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_secs: i64,
    pub max_ttl_secs: i64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl TokenConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs)
    }

    pub fn max_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_ttl_secs)
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides.
    ///
    /// # Configuration Priority (highest to lowest)
    /// 1. Environment variables (TOKEN__SECRET, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{RUN_MODE}.toml)
    /// 3. Default config file (config/default.toml)
    ///
    /// # Errors
    /// Returns error if required configuration values are missing or invalid
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "local".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: DATABASE__URL=postgres://... overrides database.url
            .add_source(Environment::default().separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.token.ttl_secs <= 0 || self.token.max_ttl_secs <= 0 {
            return Err(ConfigError::Message(
                "token.ttl_secs and token.max_ttl_secs must be positive".to_string(),
            ));
        }
        if self.broker.queue_capacity == 0 {
            return Err(ConfigError::Message(
                "broker.queue_capacity must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_IN_FLIGHT_LIMIT).contains(&self.broker.max_in_flight) {
            return Err(ConfigError::Message(format!(
                "broker.max_in_flight must be between 1 and {}",
                MAX_IN_FLIGHT_LIMIT
            )));
        }
        if self.env == Env::Prod && self.token.secret.len() < 32 {
            return Err(ConfigError::Message(
                "token.secret must be at least 32 bytes in prod".to_string(),
            ));
        }
        Ok(())
    }
}
