//! Configuration management for the server.

use std::env;

use orderflux_engine::SyncConfig;

/// Default number of orders requested per listing page.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// SQLite connection URL
    pub database_url: String,
    /// Base URL of the remote order API
    pub remote_base_url: String,
    /// Bearer token sent to the remote API
    pub remote_api_token: Option<String>,
    /// Orders requested per listing page
    pub page_size: u64,
    /// Drop list pages superseded by a newer first-page fetch
    pub discard_superseded_pages: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://orderflux.db?mode=rwc".to_string());

        let remote_base_url = lookup("REMOTE_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingRemoteBaseUrl)?;

        let remote_api_token = lookup("REMOTE_API_TOKEN").filter(|t| !t.is_empty());

        let page_size = match lookup("PAGE_SIZE") {
            Some(raw) => raw
                .parse()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidPageSize)?,
            None => DEFAULT_PAGE_SIZE,
        };

        let discard_superseded_pages = lookup("DISCARD_SUPERSEDED_PAGES")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            database_url,
            remote_base_url,
            remote_api_token,
            page_size,
            discard_superseded_pages,
        })
    }

    /// Worker settings derived from this configuration.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            discard_superseded_pages: self.discard_superseded_pages,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("REMOTE_BASE_URL environment variable is required")]
    MissingRemoteBaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid PAGE_SIZE value")]
    InvalidPageSize,
}
