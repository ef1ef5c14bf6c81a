//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `DB_MAX_CONNECTIONS` - Pool upper bound (default: 10)
//! - `DB_MIN_CONNECTIONS` - Pool lower bound (default: 2)
//! - `DB_ACQUIRE_TIMEOUT_SECS` - Seconds to wait for a pooled connection (default: 10)
//! - `PASSWORD_HASH_MEMORY_KIB` - Argon2 memory cost (default: 19456)
//! - `PASSWORD_HASH_ITERATIONS` - Argon2 time cost (default: 2)
//! - `PASSWORD_HASH_PARALLELISM` - Argon2 lanes (default: 1)
//! - `LOG_FORMAT` - `text` or `json` (default: text)

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 2;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines, for local use.
    #[default]
    Text,
    /// One JSON object per event, for log shipping.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected text or json, got {other}")),
        }
    }
}

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub url: SecretString,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
}

/// Argon2 cost parameters for client password hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub database: DatabaseConfig,
    pub hashing: HashingConfig,
    pub log_format: LogFormat,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup("ADMIN_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("ADMIN_DATABASE_URL".to_string()))?;

        let max_connections =
            parse_or_default(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let min_connections =
            parse_or_default(&lookup, "DB_MIN_CONNECTIONS", DEFAULT_MIN_CONNECTIONS)?;
        if min_connections > max_connections {
            return Err(ConfigError::InvalidEnvVar(
                "DB_MIN_CONNECTIONS".to_string(),
                format!("must not exceed DB_MAX_CONNECTIONS ({max_connections})"),
            ));
        }
        let acquire_timeout = Duration::from_secs(parse_or_default(
            &lookup,
            "DB_ACQUIRE_TIMEOUT_SECS",
            DEFAULT_ACQUIRE_TIMEOUT_SECS,
        )?);

        let defaults = HashingConfig::default();
        let hashing = HashingConfig {
            memory_kib: parse_or_default(&lookup, "PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or_default(&lookup, "PASSWORD_HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or_default(
                &lookup,
                "PASSWORD_HASH_PARALLELISM",
                defaults.parallelism,
            )?,
        };

        let log_format = parse_or_default(&lookup, "LOG_FORMAT", LogFormat::default())?;

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections,
                acquire_timeout,
            },
            hashing,
            log_format,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
