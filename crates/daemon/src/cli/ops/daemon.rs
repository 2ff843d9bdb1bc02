use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;
use url::Url;

use service::{spawn_service, Config, ConfigError, ObjectStoreConfig, ServiceError};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Path to a TOML config file (defaults apply to anything unset)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the API listen address
    #[arg(long)]
    pub listen_addr: Option<SocketAddr>,

    /// Override only the port of the listen address
    #[arg(long)]
    pub port: Option<u16>,

    /// Override the default log level (RUST_LOG still wins)
    #[arg(long)]
    pub log_level: Option<tracing::Level>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Base URL of the entity store
    #[arg(long)]
    pub entity_url: Option<Url>,

    /// Base URL of the permission service
    #[arg(long)]
    pub permission_url: Option<Url>,

    /// Endpoint batch messages are POSTed to
    #[arg(long)]
    pub queue_url: Option<Url>,

    /// Base URL used to build status links for queued batches
    #[arg(long)]
    pub status_base_url: Option<String>,

    /// Stage batches on the local filesystem under this directory
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Use in-memory collaborators instead of the HTTP services
    #[arg(long)]
    pub dev: bool,

    /// JSON fixtures to seed the in-memory stores with in dev mode
    #[arg(long)]
    pub dev_fixtures: Option<PathBuf>,
}

impl Daemon {
    /// Load the config file, then apply any flags on top of it.
    fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(port) = self.port {
            config.listen_addr.set_port(port);
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        if let Some(url) = &self.entity_url {
            config.entity_url = Some(url.clone());
        }
        if let Some(url) = &self.permission_url {
            config.permission_url = Some(url.clone());
        }
        if let Some(url) = &self.queue_url {
            config.queue_url = Some(url.clone());
        }
        if let Some(url) = &self.status_base_url {
            config.status_base_url = url.clone();
        }
        if let Some(path) = &self.staging_dir {
            config.staging = ObjectStoreConfig::Local { path: path.clone() };
        }
        config.dev |= self.dev;
        if let Some(path) = &self.dev_fixtures {
            config.dev_fixtures = Some(path.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("daemon failed: {0}")]
    Failed(#[from] ServiceError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = self.resolve_config()?;
        spawn_service(&config).await?;
        Ok("daemon ended".to_string())
    }
}
