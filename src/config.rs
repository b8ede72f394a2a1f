// src/config.rs

//! Harvester configuration.
//!
//! Every knob has a default, so an empty TOML file (or no file at all) yields
//! a working configuration. CLI flags are applied on top by the binary.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{AppError, Result};

/// Browser-like User-Agent; some sites reject the default client string.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36";

mod defaults {
    pub fn user_agent() -> String {
        super::DEFAULT_USER_AGENT.to_string()
    }

    pub fn timeout() -> u64 {
        30
    }

    pub fn max_retries() -> usize {
        10
    }

    pub fn backoff_factor() -> f64 {
        0.1
    }

    pub fn max_redirects() -> usize {
        20
    }
}

/// Basic credentials in `user:password` form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl FromStr for BasicAuth {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let (username, password) = s
            .split_once(':')
            .ok_or_else(|| AppError::validation("Credentials must be given as user:password"))?;
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// HTTP session settings shared by every request the harvester makes.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// User-Agent header sent with every request.
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
    /// Per-request timeout in seconds.
    #[serde(default = "defaults::timeout")]
    pub timeout: u64,
    /// Retries of a transient status before the error surfaces.
    #[serde(default = "defaults::max_retries")]
    pub max_retries: usize,
    /// Base of the exponential retry backoff, in seconds.
    #[serde(default = "defaults::backoff_factor")]
    pub backoff_factor: f64,
    /// Redirects followed before a URL is given up on.
    #[serde(default = "defaults::max_redirects")]
    pub max_redirects: usize,
    /// Seconds to sleep after each successful request.
    #[serde(default)]
    pub wait: Option<f64>,
    /// Scale the wait by a random factor in `[0.5, 1.5]`.
    #[serde(default)]
    pub random_wait: bool,
    /// Proxy URL applied to all requests.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Cookie header sent with every request (`k=v; k2=v2`).
    #[serde(default)]
    pub cookies: Option<String>,
    /// Basic credentials sent with every request.
    #[serde(default)]
    pub auth: Option<BasicAuth>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout: defaults::timeout(),
            max_retries: defaults::max_retries(),
            backoff_factor: defaults::backoff_factor(),
            max_redirects: defaults::max_redirects(),
            wait: None,
            random_wait: false,
            proxy: None,
            cookies: None,
            auth: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(AppError::config("user_agent must not be empty"));
        }
        if self.timeout == 0 {
            return Err(AppError::config("timeout must be at least one second"));
        }
        if self.backoff_factor < 0.0 {
            return Err(AppError::config("backoff_factor must not be negative"));
        }
        if let Some(wait) = self.wait {
            if wait < 0.0 {
                return Err(AppError::config("wait must not be negative"));
            }
        }
        if self.random_wait && self.wait.is_none() {
            return Err(AppError::config("random_wait requires a base wait time"));
        }
        Ok(())
    }
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.session.validate()
    }
}
