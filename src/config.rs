use anyhow::{Context, Result, ensure};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub poll_interval_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            api_base_url: var("DASHBOARD_API_URL")
                .unwrap_or_else(|| "http://localhost:3000/api/v1".to_string()),
            poll_interval_seconds: var("POLL_INTERVAL_SECONDS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .context("Invalid POLL_INTERVAL_SECONDS")?,
            request_timeout_seconds: var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECONDS")?,
        };

        ensure!(config.poll_interval_seconds > 0, "POLL_INTERVAL_SECONDS must be positive");
        ensure!(config.request_timeout_seconds > 0, "REQUEST_TIMEOUT_SECONDS must be positive");

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
