//! Configuration file schema and parsing.
//!
//! Config files are JSON (`.json` extension) or TOML (anything else). The
//! legacy JSON field names are accepted as aliases, so an existing
//! `config.json` keeps working:
//!
//! ```json
//! {
//!   "log": "logs/checker.log",
//!   "webhook": "https://hooks.example.com/send?token=abc",
//!   "joblist": [
//!     {
//!       "descript": "main site",
//!       "method": "get",
//!       "url": "https://example.com/health",
//!       "duration": 30
//!     }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One monitored HTTP target. Immutable after load; each job monitor owns
/// its own copy.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSpec {
    #[serde(default, alias = "descript")]
    pub description: String,

    /// `"post"` (exactly) probes with POST; anything else probes with GET.
    #[serde(default)]
    pub method: String,

    /// Target URL. An empty URL disables the endpoint without being an error.
    #[serde(default)]
    pub url: String,

    /// Optional Host header override.
    #[serde(default)]
    pub host: String,

    #[serde(default, alias = "contentType")]
    pub content_type: String,

    /// Optional request body, sent whenever non-empty.
    #[serde(default)]
    pub data: String,

    /// Seconds to sleep between probes.
    #[serde(default = "default_interval_secs", alias = "duration")]
    pub interval_secs: u64,

    /// Per-probe request timeout in seconds. Absent means no deadline: the
    /// transport's own limits apply and a hung probe occupies its monitor.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Log file path. Absent means log to standard output.
    #[serde(default)]
    pub log: Option<PathBuf>,

    /// Webhook URL alerts are POSTed to.
    #[serde(default)]
    pub webhook: String,

    #[serde(default, alias = "joblist")]
    pub endpoints: Vec<EndpointSpec>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: AppConfig = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.webhook.is_empty() {
            let parsed = url::Url::parse(&self.webhook)
                .map_err(|e| ConfigError::Invalid(format!("webhook URL {}: {}", self.webhook, e)))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::Invalid(format!(
                    "webhook URL must use http or https: {}",
                    self.webhook
                )));
            }
        }

        for (i, ep) in self.endpoints.iter().enumerate() {
            if ep.url.is_empty() {
                // Disabled endpoint, skipped by its monitor.
                continue;
            }
            let parsed = url::Url::parse(&ep.url).map_err(|e| {
                ConfigError::Invalid(format!("endpoint URL at index {}: {} ({})", i, ep.url, e))
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::Invalid(format!(
                    "endpoint URL must use http or https at index {}: {}",
                    i, ep.url
                )));
            }
            if ep.interval_secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "endpoint at index {} has a zero polling interval",
                    i
                )));
            }
        }

        Ok(())
    }
}
