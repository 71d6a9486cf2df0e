//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TABLESIDE_ADMIN_EMAIL` - Bootstrap admin account email
//! - `TABLESIDE_ADMIN_PASSWORD` - Bootstrap admin account password
//!
//! ## Optional
//! - `TABLESIDE_HOST` - Bind address (default: 127.0.0.1)
//! - `TABLESIDE_PORT` - Listen port (default: 3000)
//! - `TABLESIDE_ADMIN_USERNAME` - Bootstrap admin display name (default: admin)
//! - `TABLESIDE_MANAGER_EMAIL` / `TABLESIDE_MANAGER_PASSWORD` - Bootstrap manager account
//! - `TABLESIDE_STAFF_EMAIL` / `TABLESIDE_STAFF_PASSWORD` - Bootstrap staff account
//! - `TABLESIDE_TOKEN_TTL_SECS` - Identity token lifetime (default: 3600)
//! - `TABLESIDE_MENU_CACHE_TTL_SECS` - Menu cache lifetime (default: 60)
//! - `TABLESIDE_SEED_MENU` - Seed a demo menu when the catalog is empty (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

use tableside_core::Role;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
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

/// A management account seeded at startup.
#[derive(Clone)]
pub struct BootstrapAccountConfig {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub role: Role,
}

impl std::fmt::Debug for BootstrapAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAccountConfig")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Management accounts seeded at startup
    pub bootstrap_accounts: Vec<BootstrapAccountConfig>,
    /// Identity token lifetime in seconds
    pub token_ttl_secs: i64,
    /// Menu cache lifetime in seconds
    pub menu_cache_ttl_secs: u64,
    /// Seed a demo menu when the catalog is empty
    pub seed_menu: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if bootstrap passwords fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("TABLESIDE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("TABLESIDE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("TABLESIDE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("TABLESIDE_PORT".to_string(), e.to_string()))?;

        let token_ttl_secs = parse_env_or_default("TABLESIDE_TOKEN_TTL_SECS", 3600)?;
        let menu_cache_ttl_secs = parse_env_or_default("TABLESIDE_MENU_CACHE_TTL_SECS", 60)?;
        let seed_menu = get_env_or_default("TABLESIDE_SEED_MENU", "false") == "true";

        let bootstrap_accounts = load_bootstrap_accounts()?;

        Ok(Self {
            host,
            port,
            bootstrap_accounts,
            token_ttl_secs,
            menu_cache_ttl_secs,
            seed_menu,
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

/// Load the bootstrap account set: admin required, manager and staff optional.
fn load_bootstrap_accounts() -> Result<Vec<BootstrapAccountConfig>, ConfigError> {
    let mut accounts = vec![BootstrapAccountConfig {
        username: get_env_or_default("TABLESIDE_ADMIN_USERNAME", "admin"),
        email: get_required_env("TABLESIDE_ADMIN_EMAIL")?,
        password: get_validated_password("TABLESIDE_ADMIN_PASSWORD")?,
        role: Role::Admin,
    }];

    for (role, username, email_var, password_var) in [
        (Role::Manager, "manager", "TABLESIDE_MANAGER_EMAIL", "TABLESIDE_MANAGER_PASSWORD"),
        (Role::Staff, "staff", "TABLESIDE_STAFF_EMAIL", "TABLESIDE_STAFF_PASSWORD"),
    ] {
        if let Some(email) = get_optional_env(email_var) {
            accounts.push(BootstrapAccountConfig {
                username: username.to_string(),
                email,
                password: get_validated_password(password_var)?,
                role,
            });
        }
    }

    Ok(accounts)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a numeric environment variable with a default value.
fn parse_env_or_default<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Validate that a bootstrap password is not a placeholder and meets the
/// minimum length.
fn validate_password_strength(password: &str, var_name: &str) -> Result<(), ConfigError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_PASSWORD_LENGTH,
                password.len()
            ),
        ));
    }

    let lower = password.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate a bootstrap password from environment.
fn get_validated_password(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_password_strength(&value, key)?;
    Ok(SecretString::from(value))
}
