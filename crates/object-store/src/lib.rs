//! Object storage backed staging area
//!
//! Staged component copies and batch manifests live under
//! `staging/<batch_id>/` in one of several backends: S3-compatible
//! services (AWS S3, MinIO, R2), the local filesystem, or memory.
//!
//! # Example
//!
//! ```rust,no_run
//! use reprocess_object_store::{ObjectStaging, ObjectStoreConfig};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), reprocess_object_store::StagingError> {
//! let staging = ObjectStaging::new(ObjectStoreConfig::Local {
//!     path: PathBuf::from("/tmp/staging"),
//! })
//! .await?;
//! staging
//!     .put_object("staging/reprocess_x/_manifest.json", "{}".into())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod storage;

pub use error::{Result, StagingError};
pub use storage::{ObjectStaging, ObjectStoreConfig};
