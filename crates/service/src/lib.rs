//! Service layer for the reprocessing pipeline.
//!
//! Wires the pipeline in `common` to the outside world:
//! - Configuration (TOML file with CLI overrides)
//! - HTTP clients for the entity store, permission service and batch queue
//! - State management (pipeline plus staging handle)
//! - Fixture seeding for `dev` runs
//! - HTTP API (`/api/v0/reprocess`, `/api/v0/batches`, `/_status`)
//! - Process lifecycle (logging, signals, graceful shutdown)

pub mod clients;
pub mod config;
pub mod fixtures;
pub mod http;
pub mod process;
pub mod state;
pub mod version;

// Re-export key types for convenience
pub use config::{Config, ConfigError};
pub use object_store::ObjectStoreConfig;
pub use process::{spawn_service, ServiceError};
pub use state::{State as ServiceState, StateSetupError};
