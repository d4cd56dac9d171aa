//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub github: GitHubOAuthConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

/// GitHub OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with the OAuth app
    /// e.g., "https://signin.example.com/callback"
    pub redirect_uri: String,
    /// Authorization endpoint the browser is sent to
    pub authorize_url: String,
    /// Token endpoint the authorization code is exchanged at
    pub token_url: String,
    /// User-info endpoint returning `login` and `email`
    pub user_url: String,
    /// User-Agent header sent upstream (GitHub rejects requests without one)
    pub user_agent: String,
    /// Timeout applied to each outbound call, in seconds
    pub timeout_seconds: u64,
    /// Where the access token goes on the profile request
    #[serde(default)]
    pub token_placement: TokenPlacement,
}

impl GitHubOAuthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Access token placement on the user-info request
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenPlacement {
    /// `Authorization: Bearer <token>`
    #[default]
    Header,
    /// `?access_token=<token>`
    Query,
}

/// Session cookie and store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// HMAC key for the session cookie (32+ bytes)
    pub secret: String,
    /// Session cookie name (default: "sid")
    pub cookie_name: String,
    /// Session lifetime in seconds (default: 86400 = 1 day)
    pub ttl_seconds: u64,
    /// Force the Secure cookie flag; derived from the redirect URI if unset
    pub secure: Option<bool>,
    /// HttpOnly cookie flag (default: true)
    pub http_only: bool,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives used when RUST_LOG is unset, e.g. `info` or
    /// `github_signin=debug,tower_http=info`
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (GITHUB_SIGNIN__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("github.authorize_url", "https://github.com/login/oauth/authorize")?
            .set_default("github.token_url", "https://github.com/login/oauth/access_token")?
            .set_default("github.user_url", "https://api.github.com/user")?
            .set_default(
                "github.user_agent",
                concat!("github-signin/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("github.timeout_seconds", 10)?
            .set_default("github.token_placement", "header")?
            .set_default("session.cookie_name", "sid")?
            .set_default("session.ttl_seconds", 86400)?
            .set_default("session.http_only", true)?
            .set_default("logging.level", "github_signin=info,tower_http=debug")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (GITHUB_SIGNIN__*)
            .add_source(
                Environment::with_prefix("GITHUB_SIGNIN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Whether the session and state cookies carry the Secure flag
    pub fn should_use_secure_cookies(&self) -> bool {
        if let Some(secure) = self.session.secure {
            return secure;
        }

        match url::Url::parse(&self.github.redirect_uri) {
            Ok(url) => {
                url.scheme() == "https" || !is_local_host(url.host_str().unwrap_or_default())
            }
            Err(_) => true,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        const MIN_SESSION_SECRET_BYTES: usize = 32;

        for (key, value) in [
            ("github.client_id", &self.github.client_id),
            ("github.client_secret", &self.github.client_secret),
            ("session.cookie_name", &self.session.cookie_name),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Config(format!("{key} must not be empty")));
            }
        }

        for (key, value) in [
            ("github.redirect_uri", &self.github.redirect_uri),
            ("github.authorize_url", &self.github.authorize_url),
            ("github.token_url", &self.github.token_url),
            ("github.user_url", &self.github.user_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| AppError::Config(format!("{key} is not a valid URL: {e}")))?;
        }

        if self.session.secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "session.secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.session.ttl_seconds == 0 {
            return Err(AppError::Config(
                "session.ttl_seconds must be greater than 0".to_string(),
            ));
        }

        if self.github.timeout_seconds == 0 {
            return Err(AppError::Config(
                "github.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        tracing_subscriber::EnvFilter::try_new(&self.logging.level)
            .map_err(|e| AppError::Config(format!("logging.level is not a valid filter: {e}")))?;

        let redirect = url::Url::parse(&self.github.redirect_uri)
            .map_err(|e| AppError::Config(e.to_string()))?;
        let host = redirect.host_str().unwrap_or_default();
        if is_local_host(host) {
            if !self.should_use_secure_cookies() {
                tracing::warn!(
                    host = %host,
                    "Using insecure session cookies for local development"
                );
            }
        } else if redirect.scheme() != "https" {
            return Err(AppError::Config(
                "github.redirect_uri must use https for non-local hosts".to_string(),
            ));
        }

        Ok(())
    }
}

fn is_local_host(host: &str) -> bool {
    let host = host
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
