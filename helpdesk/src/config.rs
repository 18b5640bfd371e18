//! Configuration for the helpdesk server.
//!
//! Loaded from environment variables (and a `.env` file when present), with
//! defaults for everything. Unparseable values fall back to the default.

use crate::articles::PublishedAtPolicy;
use serde::Serialize;
use std::env;
use std::str::FromStr;

/// Application configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Record store settings
    pub database: DatabaseConfig,
    /// Login and token settings
    pub auth: AuthConfig,
    /// Knowledge-base settings
    pub articles: ArticlesConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` URL; the in-memory store is used when unset
    pub url: Option<String>,
    /// Maximum pool size
    pub max_connections: u32,
}

/// Login and token settings.
#[derive(Debug, Clone, Serialize)]
pub struct AuthConfig {
    /// Bearer token lifetime in minutes
    pub token_ttl_minutes: i64,
    /// Admin account seeded at start-up
    pub bootstrap_admin_email: Option<String>,
    /// Password for the seeded admin
    #[serde(skip_serializing)]
    pub bootstrap_admin_password: Option<String>,
}

/// Knowledge-base settings.
#[derive(Debug, Clone, Serialize)]
pub struct ArticlesConfig {
    /// When publishing stamps `published_at`
    #[serde(serialize_with = "serialize_display")]
    pub published_at_policy: PublishedAtPolicy,
}

fn serialize_display<S: serde::Serializer>(
    value: &PublishedAtPolicy,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Reads `.env` first if one exists; real environment variables win.
    #[must_use]
    pub fn from_env() -> Self {
        // A missing .env file is normal
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parsed(&lookup, "PORT").unwrap_or(8000),
                log_level: lookup("RUST_LOG").unwrap_or_else(|| "helpdesk=info,tower_http=info".to_string()),
                metrics_port: parsed(&lookup, "METRICS_PORT"),
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
                max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            },
            auth: AuthConfig {
                token_ttl_minutes: parsed(&lookup, "TOKEN_TTL_MINUTES").unwrap_or(30),
                bootstrap_admin_email: lookup("BOOTSTRAP_ADMIN_EMAIL"),
                bootstrap_admin_password: lookup("BOOTSTRAP_ADMIN_PASSWORD"),
            },
            articles: ArticlesConfig {
                published_at_policy: parsed(&lookup, "PUBLISHED_AT_POLICY").unwrap_or_default(),
            },
        }
    }

    /// Address the HTTP server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Bootstrap admin credentials, if both are configured.
    #[must_use]
    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        match (&self.auth.bootstrap_admin_email, &self.auth.bootstrap_admin_password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let value = lookup(key)?;
    let result = value.trim().parse().ok();
    if result.is_none() {
        tracing::warn!(key, value = %value, "Ignoring unparseable configuration value");
    }
    result
}
