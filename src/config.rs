use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::utils::api::is_http_base;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid backend URL '{value}': {source}")]
    InvalidBackendUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Backend URL '{0}' must use http or https and name a host")]
    UnsupportedBackendUrl(String),
    #[error("Invalid poll interval '{0}': expected a positive number of milliseconds")]
    InvalidPollInterval(String),
}

/// Runtime settings for the widget and the CLI.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub backend_url: String,
    pub poll_interval: Duration,
    pub user_id: Option<String>,
    pub org_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            user_id: None,
            org_id: None,
        }
    }
}

impl Config {
    /// Reads `.env` and the process environment.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, falling back to defaults for
    /// missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("HUBSPOT_BACKEND_URL") {
            config = config.with_backend_url(&url)?;
        }

        if let Some(raw) = lookup("HUBSPOT_POLL_INTERVAL_MS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ConfigError::InvalidPollInterval(raw.clone()))?;
            config.poll_interval = Duration::from_millis(millis);
        }

        config.user_id = lookup("HUBSPOT_USER_ID").filter(|v| !v.is_empty());
        config.org_id = lookup("HUBSPOT_ORG_ID").filter(|v| !v.is_empty());

        Ok(config)
    }

    pub fn with_backend_url(mut self, url: &str) -> Result<Self, ConfigError> {
        let trimmed = url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|source| ConfigError::InvalidBackendUrl {
            value: url.to_string(),
            source,
        })?;
        if !is_http_base(&parsed) {
            return Err(ConfigError::UnsupportedBackendUrl(url.to_string()));
        }
        self.backend_url = trimmed.to_string();
        Ok(self)
    }
}

/// Backend base URL baked in at build time for the browser bundle.
pub fn get_backend_url() -> String {
    option_env!("BACKEND_URL")
        .unwrap_or(DEFAULT_BACKEND_URL)
        .trim_end_matches('/')
        .to_string()
}
