//! Service Configuration
//!
//! Defaults, then an optional TOML file, then environment overrides.
//! Loaded once at startup and immutable afterwards.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub token: TokenConfig,
    pub password: PasswordConfig,
    pub log: LogConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on draining in-flight requests at shutdown
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_secs: 5,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Bearer token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HS256 signing secret; rotating it invalidates every outstanding token
    #[serde(skip_serializing)]
    pub secret: String,
    pub ttl_secs: u64,
    /// Clock drift tolerated by both token verification and revocation
    pub skew_secs: u64,
    pub issuer: String,
    pub audience: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_secs: 600,
            skew_secs: 30,
            issuer: "localhost:8080".to_string(),
            audience: "localhost:8080".to_string(),
        }
    }
}

impl TokenConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs as i64)
    }

    pub fn skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.skew_secs as i64)
    }
}

/// Password hashing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// bcrypt work factor
    pub hash_cost: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "geoservice_backend=info,tower_http=info".to_string(),
            json: false,
        }
    }
}

// Keeps TTL/skew arithmetic on chrono timestamps far from overflow
const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 3600;

impl Config {
    /// Load configuration from an optional TOML file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn apply_env(&mut self) -> Result<()> {
        override_from_env("GEOSERVICE_HOST", &mut self.server.host)?;
        override_from_env("GEOSERVICE_PORT", &mut self.server.port)?;
        override_from_env("SHUTDOWN_TIMEOUT_SECS", &mut self.server.shutdown_timeout_secs)?;

        override_from_env("TOKEN_SECRET", &mut self.token.secret)?;
        override_from_env("TOKEN_TTL_SECS", &mut self.token.ttl_secs)?;
        override_from_env("TOKEN_SKEW_SECS", &mut self.token.skew_secs)?;
        override_from_env("TOKEN_ISSUER", &mut self.token.issuer)?;
        override_from_env("TOKEN_AUDIENCE", &mut self.token.audience)?;

        override_from_env("HASH_COST", &mut self.password.hash_cost)?;

        override_from_env("LOG_FILTER", &mut self.log.filter)?;
        override_from_env("LOG_JSON", &mut self.log.json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.secret.is_empty() {
            bail!("token secret is not set (TOKEN_SECRET)");
        }
        if self.token.ttl_secs == 0 || self.token.ttl_secs > MAX_DURATION_SECS {
            bail!("token ttl must be between 1 and {} seconds", MAX_DURATION_SECS);
        }
        if self.token.skew_secs > MAX_DURATION_SECS {
            bail!("token skew must be at most {} seconds", MAX_DURATION_SECS);
        }
        if !(4..=31).contains(&self.password.hash_cost) {
            bail!(
                "bcrypt hash cost must be between 4 and 31, got {}",
                self.password.hash_cost
            );
        }
        Ok(())
    }
}

fn override_from_env<T>(key: &str, slot: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Ok(raw) = std::env::var(key) else {
        return Ok(());
    };
    *slot = raw
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))?;
    Ok(())
}
