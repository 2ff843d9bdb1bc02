use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use url::Url;

use common::materializer::ConcurrencyLimits;
use common::pipeline::PipelineConfig;
use common::resolver::DEFAULT_MAX_CASCADE_DEPTH;
use common::retry::RetryPolicy;
use object_store::ObjectStoreConfig;

/// Service configuration, read from an optional TOML file.
///
/// Every field has a default, so an empty file (or no file at all) is a
/// valid configuration for a `dev` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // http server configuration
    /// address for the API server to listen on
    pub listen_addr: SocketAddr,

    // logging
    #[serde(with = "level")]
    pub log_level: tracing::Level,
    /// Directory for log files (logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,

    // collaborators
    /// base URL of the content-addressed entity store
    pub entity_url: Option<Url>,
    /// base URL of the permission service
    pub permission_url: Option<Url>,
    /// endpoint the batch message is POSTed to
    pub queue_url: Option<Url>,
    /// timeout applied to every outbound request
    pub request_timeout_secs: u64,

    /// base URL of the downstream orchestrator, used to build status links
    pub status_base_url: String,

    /// where staged copies and manifests are written
    pub staging: ObjectStoreConfig,

    // pipeline tuning
    pub retry: RetryPolicy,
    pub limits: ConcurrencyLimits,
    pub max_cascade_depth: usize,

    /// use in-memory collaborators instead of the HTTP clients
    pub dev: bool,
    /// JSON fixtures loaded into the in-memory stores in dev mode
    pub dev_fixtures: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 3000),
            log_level: tracing::Level::INFO,
            log_dir: None,
            entity_url: None,
            permission_url: None,
            queue_url: None,
            request_timeout_secs: 30,
            status_base_url: PipelineConfig::default().status_base_url,
            staging: ObjectStoreConfig::default(),
            retry: RetryPolicy::default(),
            limits: ConcurrencyLimits::default(),
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
            dev: false,
            dev_fixtures: None,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&raw)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.entities == 0 || self.limits.components == 0 || self.limits.in_flight == 0
        {
            return Err(ConfigError::Invalid(
                "concurrency limits must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.max_cascade_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_cascade_depth must be at least 1".into(),
            ));
        }
        Url::parse(&self.status_base_url)?;
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            retry: self.retry,
            limits: self.limits,
            max_cascade_depth: self.max_cascade_depth,
            status_base_url: self.status_base_url.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

mod level {
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(level: &tracing::Level, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(level.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<tracing::Level, D::Error> {
        let raw = String::deserialize(d)?;
        tracing::Level::from_str(&raw).map_err(serde::de::Error::custom)
    }
}
