//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPPER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SHOPPER_BASE_URL` - Public URL of this server, used for the OAuth redirect URI
//! - `GROCER_CLIENT_ID` - Grocer OAuth client ID
//! - `GROCER_CLIENT_SECRET` - Grocer OAuth client secret (high entropy)
//!
//! ## Optional
//! - `SHOPPER_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOPPER_PORT` - Listen port (default: 8080)
//! - `SHOPPER_REQUEST_TIMEOUT_SECS` - Per-request deadline (default: 30)
//! - `GROCER_API_URL` - Grocer API origin (default: <https://api.kroger.com>)
//! - `GROCER_SCOPES` - Scopes requested at login (default: `cart.basic:write profile.compact`)
//! - `GROCER_HTTP_TIMEOUT_SECS` - Timeout for each outbound grocer call (default: 10)
//! - `CATALOG_PRODUCT_TTL_SECS` - Product cache entry lifetime (default: 1 day)
//! - `CATALOG_LOCATION_TTL_SECS` - Location cache entry lifetime (default: 7 days)
//! - `CATALOG_CACHE_CAPACITY` - Max entries in the in-process cache (default: 50000)
//! - `REDIS_URL` - Use Redis for the catalog cache instead of the in-process cache
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_GROCER_API_URL: &str = "https://api.kroger.com";
const DEFAULT_GROCER_SCOPES: &str = "cart.basic:write profile.compact";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
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

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this server, without a trailing slash
    pub base_url: String,
    /// Deadline applied to every inbound request
    pub request_timeout: Duration,
    /// Grocer API configuration
    pub grocer: GrocerConfig,
    /// Catalog cache configuration
    pub catalog: CatalogConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Grocer API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct GrocerConfig {
    /// API origin, e.g. `https://api.kroger.com`
    pub api_url: Url,
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: SecretString,
    /// Scopes requested on the authorize redirect
    pub scopes: Vec<String>,
    /// OAuth redirect URI registered with the grocer
    pub redirect_uri: String,
    /// Timeout applied to each outbound call
    pub http_timeout: Duration,
}

impl std::fmt::Debug for GrocerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrocerConfig")
            .field("api_url", &self.api_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("redirect_uri", &self.redirect_uri)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

/// Catalog cache configuration.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Lifetime of a cached product entry
    pub product_ttl: Duration,
    /// Lifetime of a cached location entry
    pub location_ttl: Duration,
    /// Capacity of the in-process backend
    pub capacity: u64,
    /// Redis connection URL (may contain a password)
    pub redis_url: Option<SecretString>,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("product_ttl", &self.product_ttl)
            .field("location_ttl", &self.location_ttl)
            .field("capacity", &self.capacity)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SHOPPER_DATABASE_URL")?;
        let host = get_parsed_or_default::<IpAddr>("SHOPPER_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("SHOPPER_PORT", "8080")?;
        let base_url = normalize_base_url("SHOPPER_BASE_URL", &get_required_env("SHOPPER_BASE_URL")?)?;
        let request_timeout = get_secs_or_default("SHOPPER_REQUEST_TIMEOUT_SECS", 30)?;

        let grocer = GrocerConfig::from_env(&base_url)?;
        let catalog = CatalogConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            request_timeout,
            grocer,
            catalog,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl GrocerConfig {
    fn from_env(base_url: &str) -> Result<Self, ConfigError> {
        let raw_api_url = get_env_or_default("GROCER_API_URL", DEFAULT_GROCER_API_URL);
        let api_url = Url::parse(&raw_api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("GROCER_API_URL".to_string(), e.to_string()))?;

        let scopes = parse_scopes(&get_env_or_default("GROCER_SCOPES", DEFAULT_GROCER_SCOPES));
        if scopes.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "GROCER_SCOPES".to_string(),
                "at least one scope is required".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            client_id: get_required_env("GROCER_CLIENT_ID")?,
            client_secret: get_validated_secret("GROCER_CLIENT_SECRET")?,
            scopes,
            redirect_uri: format!("{base_url}/auth/callback"),
            http_timeout: get_secs_or_default("GROCER_HTTP_TIMEOUT_SECS", 10)?,
        })
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            product_ttl: get_secs_or_default("CATALOG_PRODUCT_TTL_SECS", 24 * 60 * 60)?,
            location_ttl: get_secs_or_default("CATALOG_LOCATION_TTL_SECS", 7 * 24 * 60 * 60)?,
            capacity: get_parsed_or_default::<u64>("CATALOG_CACHE_CAPACITY", "50000")?,
            redis_url: get_optional_env("REDIS_URL").map(SecretString::from),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable parsed into `T`, falling back to `default`.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a positive number of seconds as a `Duration`.
fn get_secs_or_default(key: &str, default: u64) -> Result<Duration, ConfigError> {
    let secs = get_parsed_or_default::<u64>(key, &default.to_string())?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Validate the base URL and strip any trailing slash.
fn normalize_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must include a host".to_string(),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Split a space or comma separated scope list.
fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
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
    let len = s.len() as f64;
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

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the secret issued by the grocer developer portal."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
