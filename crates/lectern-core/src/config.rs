//! Lectern configuration.
//!
//! Loaded from TOML, then overridden by `LECTERN_<SECTION>_<KEY>`
//! environment variables:
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 3000
//!
//! [content]
//! root = "/srv/lectern/content"
//!
//! [auth]
//! mode = "local"
//! session_secret = "change-me"
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::traits::ConfigManager;
use crate::{Error, Result};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "LECTERN";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LecternConfig {
    /// Display name reported by the health endpoint.
    pub site_name: String,
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Course content location.
    pub content: ContentConfig,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Authentication settings.
    pub auth: AuthSettings,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl Default for LecternConfig {
    fn default() -> Self {
        Self {
            site_name: "lectern".to_string(),
            server: ServerConfig::default(),
            content: ContentConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Origins allowed by CORS. Empty means same-origin only.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Course content location and caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory containing one subdirectory per course.
    pub root: PathBuf,
    /// Cache parsed courses and compiled lessons.
    pub cache: bool,
    /// Serve lessons marked `draft: true`.
    pub include_drafts: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("content"),
            cache: true,
            include_drafts: false,
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL.
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:lectern.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

/// How requests are authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Skip authentication and inject a fixed admin user. Local development only.
    #[default]
    Dev,
    /// Email and password accounts stored in the database.
    Local,
    /// OIDC ID tokens exchanged for session tokens.
    Oidc,
}

impl AuthMode {
    /// Lowercase name as used in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Local => "local",
            Self::Oidc => "oidc",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "local" => Ok(Self::Local),
            "oidc" => Ok(Self::Oidc),
            other => Err(Error::config(format!(
                "unknown auth mode '{other}' (expected dev, local, or oidc)"
            ))),
        }
    }
}

/// Longest accepted session lifetime (one year).
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 366;

/// Authentication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Authentication mode.
    pub mode: AuthMode,
    /// HMAC secret for session tokens.
    pub session_secret: String,
    /// Session token lifetime in hours.
    pub session_ttl_hours: u64,
    /// Expected `iss` of OIDC ID tokens.
    pub oidc_issuer: String,
    /// Expected `aud` of OIDC ID tokens (the client ID).
    pub oidc_audience: String,
    /// JWKS endpoint of the identity provider.
    pub oidc_jwks_url: String,
    /// Only accept emails from this domain. Empty means any domain.
    pub allowed_domain: String,
    /// Emails granted the admin role on first sign-in.
    pub admin_emails: Vec<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            mode: AuthMode::Dev,
            session_secret: String::new(),
            session_ttl_hours: 168,
            oidc_issuer: String::new(),
            oidc_audience: String::new(),
            oidc_jwks_url: String::new(),
            allowed_domain: String::new(),
            admin_emails: Vec::new(),
        }
    }
}

impl AuthSettings {
    /// Whether `email` is listed in `admin_emails` (case-insensitive).
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email.trim()))
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LecternConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("invalid config: {e}")))
    }

    /// Apply `LECTERN_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}_{suffix}"));

        if let Some(v) = var("SITE_NAME") {
            self.site_name = v;
        }
        if let Some(v) = var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = var("SERVER_PORT") {
            self.server.port = parse_override("SERVER_PORT", &v)?;
        }
        if let Some(v) = var("SERVER_CORS_ORIGINS") {
            self.server.cors_origins = split_list(&v);
        }
        if let Some(v) = var("CONTENT_ROOT") {
            self.content.root = crate::util::paths::expand_tilde(&v);
        }
        if let Some(v) = var("CONTENT_CACHE") {
            self.content.cache = parse_override("CONTENT_CACHE", &v)?;
        }
        if let Some(v) = var("CONTENT_INCLUDE_DRAFTS") {
            self.content.include_drafts = parse_override("CONTENT_INCLUDE_DRAFTS", &v)?;
        }
        if let Some(v) = var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_override("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = var("AUTH_MODE") {
            self.auth.mode = v.parse()?;
        }
        if let Some(v) = var("AUTH_SESSION_SECRET") {
            self.auth.session_secret = v;
        }
        if let Some(v) = var("AUTH_SESSION_TTL_HOURS") {
            self.auth.session_ttl_hours = parse_override("AUTH_SESSION_TTL_HOURS", &v)?;
        }
        if let Some(v) = var("AUTH_OIDC_ISSUER") {
            self.auth.oidc_issuer = v;
        }
        if let Some(v) = var("AUTH_OIDC_AUDIENCE") {
            self.auth.oidc_audience = v;
        }
        if let Some(v) = var("AUTH_OIDC_JWKS_URL") {
            self.auth.oidc_jwks_url = v;
        }
        if let Some(v) = var("AUTH_ALLOWED_DOMAIN") {
            self.auth.allowed_domain = v;
        }
        if let Some(v) = var("AUTH_ADMIN_EMAILS") {
            self.auth.admin_emails = split_list(&v);
        }
        if let Some(v) = var("LOGGING_LEVEL") {
            self.logging.level = v;
        }
        Ok(())
    }

    /// Check cross-field requirements.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config("server.port must be non-zero"));
        }
        if self.database.max_connections == 0 {
            return Err(Error::config("database.max_connections must be at least 1"));
        }
        if self.auth.session_ttl_hours == 0 {
            return Err(Error::config("auth.session_ttl_hours must be at least 1"));
        }
        if self.auth.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(Error::config(format!(
                "auth.session_ttl_hours must be at most {MAX_SESSION_TTL_HOURS}"
            )));
        }
        match self.auth.mode {
            AuthMode::Dev => {
                log::warn!("auth.mode = \"dev\": authentication is bypassed for every request");
            }
            AuthMode::Local | AuthMode::Oidc if self.auth.session_secret.len() < 16 => {
                return Err(Error::config(format!(
                    "auth.mode = \"{}\" requires auth.session_secret of at least 16 characters",
                    self.auth.mode
                )));
            }
            _ => {}
        }
        if self.auth.mode == AuthMode::Oidc {
            for (key, value) in [
                ("auth.oidc_issuer", &self.auth.oidc_issuer),
                ("auth.oidc_audience", &self.auth.oidc_audience),
                ("auth.oidc_jwks_url", &self.auth.oidc_jwks_url),
            ] {
                if value.trim().is_empty() {
                    return Err(Error::config(format!("auth.mode = \"oidc\" requires {key}")));
                }
            }
        }
        Ok(())
    }
}

impl ConfigManager for LecternConfig {
    fn project_name() -> &'static str {
        "lectern"
    }

    fn load(explicit: Option<&str>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit) {
            Some(path) if path.exists() => {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;
                log::debug!("Loading config from {}", path.display());
                Self::from_toml_str(&content)?
            }
            Some(path) if explicit.is_some() => {
                return Err(Error::config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            _ => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let vars = [
            ("SITE_NAME", self.site_name.clone()),
            ("SERVER_HOST", self.server.host.clone()),
            ("SERVER_PORT", self.server.port.to_string()),
            ("SERVER_CORS_ORIGINS", self.server.cors_origins.join(",")),
            ("CONTENT_ROOT", self.content.root.display().to_string()),
            ("CONTENT_CACHE", self.content.cache.to_string()),
            ("CONTENT_INCLUDE_DRAFTS", self.content.include_drafts.to_string()),
            ("DATABASE_URL", self.database.url.clone()),
            (
                "DATABASE_MAX_CONNECTIONS",
                self.database.max_connections.to_string(),
            ),
            ("AUTH_MODE", self.auth.mode.to_string()),
            ("AUTH_SESSION_SECRET", self.auth.session_secret.clone()),
            (
                "AUTH_SESSION_TTL_HOURS",
                self.auth.session_ttl_hours.to_string(),
            ),
            ("AUTH_OIDC_ISSUER", self.auth.oidc_issuer.clone()),
            ("AUTH_OIDC_AUDIENCE", self.auth.oidc_audience.clone()),
            ("AUTH_OIDC_JWKS_URL", self.auth.oidc_jwks_url.clone()),
            ("AUTH_ALLOWED_DOMAIN", self.auth.allowed_domain.clone()),
            ("AUTH_ADMIN_EMAILS", self.auth.admin_emails.join(",")),
            ("LOGGING_LEVEL", self.logging.level.clone()),
        ];
        Ok(vars
            .into_iter()
            .map(|(key, value)| (format!("{ENV_PREFIX}_{key}"), value))
            .collect())
    }
}

fn parse_override<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::config(format!("{ENV_PREFIX}_{key}: invalid value '{value}': {e}")))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
