//! This module controls configuration parsing from the end user. A
//! configuration is YAML, read from a file or, when set, from the
//! `TALLYBOARD_CONFIG` environment variable.

use std::{env, path::Path, time::Duration};

use reqwest::Url;
use serde::Deserialize;
use tallyboard_engine::{Layout, Limits, Prefixes, ViewOptions};
use tracing::debug;

/// Environment variable that, when set, holds the whole configuration
pub const CONFIG_ENV: &str = "TALLYBOARD_CONFIG";

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading the configuration file
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        /// File path
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
    /// The endpoint is not an absolute http or https URL
    #[error("Invalid endpoint {0:?}: must be an http or https URL")]
    Endpoint(String),
    /// A period that must be positive was zero
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    15
}

/// Main configuration struct for this program
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The metrics endpoint to fetch
    pub endpoint: Option<String>,
    /// Re-fetch the endpoint on a fixed period
    #[serde(default)]
    pub auto_refresh: bool,
    /// Seconds between refresh cycles
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    /// Seconds before a fetch is abandoned
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Table size preset
    #[serde(default)]
    pub layout: Layout,
    /// Metric family prefixes
    #[serde(default)]
    pub prefixes: Prefixes,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            auto_refresh: false,
            refresh_interval_seconds: default_refresh_interval(),
            request_timeout_seconds: default_request_timeout(),
            layout: Layout::default(),
            prefixes: Prefixes::default(),
        }
    }
}

impl Config {
    /// Parse and validate a YAML configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed, names unknown fields, or
    /// holds an invalid endpoint or a zero period.
    pub fn from_yaml(contents: &str) -> Result<Self, Error> {
        // An empty document is the default configuration.
        let config: Self = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from [`CONFIG_ENV`] if set, else from `path`.
    ///
    /// # Errors
    ///
    /// See [`Config::from_yaml`]; also fails if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = if let Ok(value) = env::var(CONFIG_ENV) {
            debug!("Using config from env var '{CONFIG_ENV}'");
            value
        } else {
            debug!("Attempting to open configuration file at: {}", path.display());
            std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
                path: path.display().to_string(),
                source,
            })?
        };
        Self::from_yaml(&contents)
    }

    fn validate(&self) -> Result<(), Error> {
        if let Some(endpoint) = &self.endpoint {
            parse_endpoint(endpoint)?;
        }
        if self.refresh_interval_seconds == 0 {
            return Err(Error::ZeroDuration("refresh_interval_seconds"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(Error::ZeroDuration("request_timeout_seconds"));
        }
        Ok(())
    }

    /// Period between refresh cycles.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }

    /// Per-fetch deadline.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// View options for the engine, no media filter and the lifetime window.
    #[must_use]
    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            prefixes: self.prefixes.clone(),
            limits: Limits::from(self.layout),
            ..ViewOptions::default()
        }
    }
}

/// Parse `endpoint` as an absolute http or https URL.
///
/// # Errors
///
/// Returns [`Error::Endpoint`] for anything else.
pub fn parse_endpoint(endpoint: &str) -> Result<Url, Error> {
    match Url::parse(endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => Ok(url),
        _ => Err(Error::Endpoint(endpoint.to_string())),
    }
}
