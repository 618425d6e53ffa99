//! Environment-based configuration
//!
//! Every setting has a default suitable for local development, so the
//! service starts with no environment at all (SQLite database, no event
//! bus, no status pushes).

use crate::application::expiration::ExpirationConfig;
use crate::infrastructure::{DatabaseConfig, RegistryConfig};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Grace period for in-flight requests on shutdown
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Full application configuration assembled from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub registry: RegistryConfig,
    pub expiration: ExpirationConfig,
    /// Shared HS256 secret for verifying bearer tokens
    pub jwt_secret: String,
    /// Kafka bootstrap brokers; empty disables event publishing
    pub kafka_brokers: String,
    /// Allowed CORS origins; empty means any
    pub cors_origins: Vec<String>,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_parse_or("PORT", 8000),
                shutdown_timeout_secs: env_parse_or("SHUTDOWN_TIMEOUT_SECS", 30),
            },
            database: DatabaseConfig::from_env(),
            registry: RegistryConfig {
                base_url: env_or("INVENTORY_SERVICE_URL", "http://inventory:8000")
                    .trim_end_matches('/')
                    .to_string(),
                internal_token: env_or("INTERNAL_API_TOKEN", ""),
            },
            expiration: ExpirationConfig {
                // a zero interval would make the scheduler spin
                interval_secs: env_parse_or("EXPIRATION_INTERVAL_SECS", 60).max(1),
            },
            jwt_secret: env_or("JWT_SECRET", "super-secret-key-change-in-production"),
            kafka_brokers: env_or("KAFKA_BROKERS", ""),
            cors_origins: env_or("CORS_ORIGINS", "")
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            log_level: env_or("LOG_LEVEL", "info"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_helper_falls_back_on_garbage() {
        std::env::set_var("TEST_CONFIG_PORT", "not-a-number");
        assert_eq!(env_parse_or("TEST_CONFIG_PORT", 8000u16), 8000);
        std::env::remove_var("TEST_CONFIG_PORT");
    }

    #[test]
    fn zero_expiration_interval_is_clamped() {
        std::env::set_var("EXPIRATION_INTERVAL_SECS", "0");
        let config = AppConfig::from_env();
        assert_eq!(config.expiration.interval_secs, 1);
        std::env::remove_var("EXPIRATION_INTERVAL_SECS");
    }

    #[test]
    fn address_joins_host_and_port() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
            shutdown_timeout_secs: 30,
        };
        assert_eq!(server.address(), "127.0.0.1:9000");
    }
}
