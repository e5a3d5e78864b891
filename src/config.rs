//! Service configuration
//!
//! Loaded once at process start and immutable afterwards. The signing secret
//! is passed explicitly to the identity layer rather than read from a global.

use std::env;

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};

use crate::{Result, ServiceError};

pub const ENV_JWT_SECRET: &str = "TASKS_JWT_SECRET";
pub const ENV_TOKEN_TTL_SECS: &str = "TASKS_TOKEN_TTL_SECS";
pub const ENV_DEFAULT_PAGE_SIZE: &str = "TASKS_DEFAULT_PAGE_SIZE";
pub const ENV_MAX_PAGE_SIZE: &str = "TASKS_MAX_PAGE_SIZE";

/// HS256 needs at least as many key bytes as the digest
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_PAGE_SIZE: usize = 10;

/// Credential signing settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: SecretString,
    pub token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Result<Self> {
        let secret: String = jwt_secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(ServiceError::Configuration(format!(
                "JWT secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self {
            jwt_secret: SecretString::from(secret),
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        })
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub(crate) fn secret_bytes(&self) -> &[u8] {
        self.jwt_secret.expose_secret().as_bytes()
    }
}

/// Page size settings for list operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Used when the caller does not send `first`
    pub default_page_size: usize,
    /// `None` leaves page size unbounded
    pub max_page_size: Option<usize>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub pagination: PaginationConfig,
}

impl Config {
    /// Load configuration from `TASKS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(ENV_JWT_SECRET)
            .ok_or_else(|| ServiceError::Configuration(format!("{} is not set", ENV_JWT_SECRET)))?;

        let mut auth = AuthConfig::new(secret)?;
        if let Some(ttl) = parse_var::<i64>(&lookup, ENV_TOKEN_TTL_SECS)? {
            if ttl <= 0 {
                return Err(ServiceError::Configuration(format!(
                    "{} must be positive",
                    ENV_TOKEN_TTL_SECS
                )));
            }
            auth = auth.with_token_ttl(Duration::seconds(ttl));
        }

        let mut pagination = PaginationConfig::default();
        if let Some(size) = parse_var::<usize>(&lookup, ENV_DEFAULT_PAGE_SIZE)? {
            pagination.default_page_size = size;
        }
        pagination.max_page_size = parse_var::<usize>(&lookup, ENV_MAX_PAGE_SIZE)?;

        if let Some(max) = pagination.max_page_size {
            if pagination.default_page_size > max {
                return Err(ServiceError::Configuration(format!(
                    "{} ({}) exceeds {} ({})",
                    ENV_DEFAULT_PAGE_SIZE, pagination.default_page_size, ENV_MAX_PAGE_SIZE, max
                )));
            }
        }

        tracing::info!(
            target: "pleme_tasks::config",
            token_ttl_secs = auth.token_ttl.num_seconds(),
            default_page_size = pagination.default_page_size,
            max_page_size = ?pagination.max_page_size,
            "Configuration loaded"
        );

        Ok(Self { auth, pagination })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ServiceError::Configuration(format!("{}: {}", key, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[(ENV_JWT_SECRET, SECRET)])).unwrap();
        assert_eq!(config.auth.token_ttl, Duration::days(7));
        assert_eq!(config.pagination, PaginationConfig::default());
        assert_eq!(config.auth.secret_bytes(), SECRET.as_bytes());
    }

    #[test]
    fn test_missing_secret() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = Config::from_lookup(lookup(&[(ENV_JWT_SECRET, "short")])).unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (ENV_JWT_SECRET, SECRET),
            (ENV_TOKEN_TTL_SECS, "3600"),
            (ENV_DEFAULT_PAGE_SIZE, "25"),
            (ENV_MAX_PAGE_SIZE, "50"),
        ]))
        .unwrap();
        assert_eq!(config.auth.token_ttl, Duration::hours(1));
        assert_eq!(config.pagination.default_page_size, 25);
        assert_eq!(config.pagination.max_page_size, Some(50));
    }

    #[test]
    fn test_invalid_numbers() {
        for vars in [
            [(ENV_JWT_SECRET, SECRET), (ENV_TOKEN_TTL_SECS, "soon")],
            [(ENV_JWT_SECRET, SECRET), (ENV_TOKEN_TTL_SECS, "0")],
            [(ENV_JWT_SECRET, SECRET), (ENV_MAX_PAGE_SIZE, "5")],
        ] {
            assert!(Config::from_lookup(lookup(&vars)).is_err());
        }
    }
}
