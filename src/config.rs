//! Configuration loading and validation.
//!
//! Loads from `$INQUIRYDESK_CONFIG` or `./config.toml`. A missing file means
//! defaults. Environment variables override file values.
//!
//! Precedence: env vars > config file > defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::inquiry::TerminalPolicy;
use crate::inquiry::MAX_PAGE_SIZE;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// SQLite location.
    pub database: DatabaseConfig,
    /// Session tokens standing in for the identity provider.
    pub auth: AuthConfig,
    /// Inquiry behaviour switches.
    pub inquiries: InquiriesConfig,
    /// Log level and file output.
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:3000`.
    pub bind: String,
    /// Default list page size when the request has no `limit`.
    pub page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            page_size: default_page_size(),
        }
    }
}

/// SQLite location.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file. Defaults to `~/.inquirydesk/inquirydesk.db`.
    pub path: Option<PathBuf>,
}

/// Bearer tokens mapped to roles.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Tokens that identify an admin session.
    pub admin_tokens: Vec<String>,
    /// Tokens that identify a signed-in customer.
    pub customer_tokens: Vec<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_tokens", &self.admin_tokens.len())
            .field("customer_tokens", &self.customer_tokens.len())
            .finish()
    }
}

/// Inquiry behaviour switches.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct InquiriesConfig {
    /// Whether closed inquiries still accept messages.
    pub terminal_policy: TerminalPolicy,
}

/// Log level and file output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated JSON logs. Defaults to `~/.inquirydesk/logs`.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

// Default value functions for serde

fn default_bind() -> String {
    "127.0.0.1:3000".to_owned()
}
fn default_page_size() -> u32 {
    10
}
fn default_log_level() -> String {
    "info".to_owned()
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the merged result fails validation.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using a custom env resolver (avoids `set_var` in tests).
    ///
    /// # Errors
    ///
    /// As [`Self::load`].
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = env("INQUIRYDESK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"));
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(env);
        config.validate()?;
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => {
                Err(anyhow::anyhow!("failed to read config at {}: {e}", path.display()))
            }
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML or unknown enum values.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Apply environment variable overrides (env > config > defaults).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("INQUIRYDESK_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = env("INQUIRYDESK_PAGE_SIZE") {
            match v.parse() {
                Ok(n) => self.server.page_size = n,
                Err(_) => tracing::warn!(
                    var = "INQUIRYDESK_PAGE_SIZE",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("INQUIRYDESK_DATABASE") {
            self.database.path = Some(PathBuf::from(v));
        }
        if let Some(v) = env("INQUIRYDESK_ADMIN_TOKENS") {
            self.auth.admin_tokens = split_list(&v);
        }
        if let Some(v) = env("INQUIRYDESK_CUSTOMER_TOKENS") {
            self.auth.customer_tokens = split_list(&v);
        }
        if let Some(v) = env("INQUIRYDESK_TERMINAL_POLICY") {
            match v.as_str() {
                "open" => self.inquiries.terminal_policy = TerminalPolicy::Open,
                "locked" => self.inquiries.terminal_policy = TerminalPolicy::Locked,
                _ => tracing::warn!(
                    var = "INQUIRYDESK_TERMINAL_POLICY",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("INQUIRYDESK_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("INQUIRYDESK_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(v));
        }
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparsable bind address, an out-of-range
    /// page size, or a token configured for both roles.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        if self.server.page_size == 0 || self.server.page_size > MAX_PAGE_SIZE {
            anyhow::bail!(
                "server.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.server.page_size
            );
        }
        if self
            .auth
            .admin_tokens
            .iter()
            .any(|t| self.auth.customer_tokens.contains(t))
        {
            anyhow::bail!("a token is listed as both admin and customer");
        }
        if self.auth.admin_tokens.is_empty() {
            tracing::warn!("no admin tokens configured; admin endpoints are unreachable");
        }
        Ok(())
    }

    /// Parsed listener address.
    ///
    /// # Errors
    ///
    /// Returns an error if `server.bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("invalid server.bind {:?}", self.server.bind))
    }

    /// Database file, falling back to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the home directory
    /// cannot be determined.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("inquirydesk.db")),
        }
    }

    /// Log directory, falling back to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is configured and the home directory
    /// cannot be determined.
    pub fn logs_dir(&self) -> Result<PathBuf> {
        match &self.logging.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("logs")),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Resolve the default data directory (`~/.inquirydesk/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn data_dir() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".inquirydesk"))
}
