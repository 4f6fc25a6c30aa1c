/// Configuration management for the API server
///
/// This module loads configuration from environment variables (after
/// reading an optional `.env` file) into a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: Enables HSTS and strict CORS (default: false)
/// - `STORE_BACKEND`: `memory` or `postgres` (default: memory)
/// - `DATABASE_URL`: PostgreSQL connection string (required for postgres)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `SIGNUP_MAX_ATTEMPTS`: Signup transaction attempts (default: 5)
/// - `ALLOW_PLAINTEXT_PASSWORDS`: Accept legacy plaintext passwords at
///   login (default: true)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use globetrotter_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Document store configuration
    pub store: StoreConfig,

    /// Signup/login behaviour
    pub accounts: AccountsConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins, `*` for any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS on)
    pub production: bool,
}

/// Which document store backend to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => anyhow::bail!("Unknown STORE_BACKEND '{}' (expected memory or postgres)", other),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Present when `backend` is `Postgres`
    pub database: Option<DatabaseConfig>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Account service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Attempts per signup before reporting a transaction conflict
    pub signup_max_attempts: u32,

    /// Whether legacy plaintext passwords may still log in
    pub allow_plaintext_passwords: bool,
}

fn parse_bool(name: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{} must be a boolean, got '{}'", name, other),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` is missing while `STORE_BACKEND=postgres`
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = match lookup("PRODUCTION") {
            Some(value) => parse_bool("PRODUCTION", &value)?,
            None => false,
        };

        let backend = match lookup("STORE_BACKEND") {
            Some(value) => value.parse::<StoreBackend>()?,
            None => StoreBackend::Memory,
        };

        let database = match backend {
            StoreBackend::Memory => None,
            StoreBackend::Postgres => {
                let url = lookup("DATABASE_URL").ok_or_else(|| {
                    anyhow::anyhow!("DATABASE_URL environment variable is required for postgres")
                })?;
                let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|| "10".to_string())
                    .parse::<u32>()?;
                Some(DatabaseConfig {
                    url,
                    max_connections,
                })
            }
        };

        let signup_max_attempts = lookup("SIGNUP_MAX_ATTEMPTS")
            .unwrap_or_else(|| "5".to_string())
            .parse::<u32>()?;
        if signup_max_attempts == 0 {
            anyhow::bail!("SIGNUP_MAX_ATTEMPTS must be at least 1");
        }

        let allow_plaintext_passwords = match lookup("ALLOW_PLAINTEXT_PASSWORDS") {
            Some(value) => parse_bool("ALLOW_PLAINTEXT_PASSWORDS", &value)?,
            None => true,
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            store: StoreConfig { backend, database },
            accounts: AccountsConfig {
                signup_max_attempts,
                allow_plaintext_passwords,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.store.database.is_none());
        assert_eq!(config.accounts.signup_max_attempts, 5);
        assert!(config.accounts.allow_plaintext_passwords);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = load(&[("STORE_BACKEND", "postgres")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let config = load(&[
            ("STORE_BACKEND", "Postgres"),
            ("DATABASE_URL", "postgresql://localhost/globetrotter"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();
        let database = config.store.database.unwrap();
        assert_eq!(database.url, "postgresql://localhost/globetrotter");
        assert_eq!(database.max_connections, 4);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "9000"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("PRODUCTION", "true"),
            ("SIGNUP_MAX_ATTEMPTS", "10"),
            ("ALLOW_PLAINTEXT_PASSWORDS", "off"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(config.api.production);
        assert_eq!(config.accounts.signup_max_attempts, 10);
        assert!(!config.accounts.allow_plaintext_passwords);
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("API_PORT", "eighty")]).is_err());
        assert!(load(&[("STORE_BACKEND", "firestore")]).is_err());
        assert!(load(&[("SIGNUP_MAX_ATTEMPTS", "0")]).is_err());
        assert!(load(&[("PRODUCTION", "maybe")]).is_err());
    }
}
