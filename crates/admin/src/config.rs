//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_BASE_URL` - Public URL for the admin panel
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `UNIT_CACHE_TTL_SECS` - Idle time before a unit is reloaded (default: 300)
//! - `TUTOR_CACHE_TTL_SECS` - Lifetime of the cached tutor list (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)
//!
//! ## Optional (Doubtfire API - all or none)
//! - `DOUBTFIRE_API_URL` - Base URL of the Doubtfire API (e.g. `https://doubtfire.example.edu`)
//! - `DOUBTFIRE_USERNAME` - Username the panel acts as
//! - `DOUBTFIRE_AUTH_TOKEN` - Auth token for that user (HIGH PRIVILEGE)
//!
//! Without the Doubtfire variables the panel runs against seeded in-memory
//! fixtures, which is only useful for local development.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "token",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin panel
    pub base_url: String,
    /// Doubtfire API configuration (`None` runs on in-memory fixtures)
    pub doubtfire: Option<DoubtfireConfig>,
    /// How long an untouched unit stays in the unit store
    pub unit_cache_ttl: Duration,
    /// How long the tutor list is cached by the API client
    pub tutor_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Doubtfire API configuration.
///
/// Implements `Debug` manually to redact the auth token.
#[derive(Clone)]
pub struct DoubtfireConfig {
    /// Base URL of the Doubtfire deployment
    pub api_url: Url,
    /// Username sent in the `Username` header
    pub username: String,
    /// Token sent in the `Auth-Token` header
    pub auth_token: SecretString,
}

impl std::fmt::Debug for DoubtfireConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoubtfireConfig")
            .field("api_url", &self.api_url.as_str())
            .field("username", &self.username)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl DoubtfireConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let api_url = get_optional_env("DOUBTFIRE_API_URL");
        let username = get_optional_env("DOUBTFIRE_USERNAME");
        let auth_token = get_optional_env("DOUBTFIRE_AUTH_TOKEN");

        match (api_url, username, auth_token) {
            (Some(url), Some(username), Some(token)) => {
                let api_url = Url::parse(&url).map_err(|e| {
                    ConfigError::InvalidEnvVar("DOUBTFIRE_API_URL".to_string(), e.to_string())
                })?;
                validate_secret_strength(&token, "DOUBTFIRE_AUTH_TOKEN")?;
                Ok(Some(Self {
                    api_url,
                    username,
                    auth_token: SecretString::from(token),
                }))
            }
            (None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "DOUBTFIRE_*".to_string(),
                "DOUBTFIRE_API_URL, DOUBTFIRE_USERNAME and DOUBTFIRE_AUTH_TOKEN must be set together"
                    .to_string(),
            )),
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("ADMIN_BASE_URL")?;

        let doubtfire = DoubtfireConfig::from_env()?;
        let unit_cache_ttl = get_duration_secs("UNIT_CACHE_TTL_SECS")?;
        let tutor_cache_ttl = get_duration_secs("TUTOR_CACHE_TTL_SECS")?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            base_url,
            doubtfire,
            unit_cache_ttl,
            tutor_cache_ttl,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns the Doubtfire configuration, if the API is configured.
    #[must_use]
    pub const fn doubtfire(&self) -> Option<&DoubtfireConfig> {
        self.doubtfire.as_ref()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a whole number of seconds, falling back to the default TTL.
fn get_duration_secs(key: &str) -> Result<Duration, ConfigError> {
    get_optional_env(key).map_or(Ok(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)), |raw| {
        raw.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the token Doubtfire issued."
            ),
        ));
    }

    Ok(())
}
