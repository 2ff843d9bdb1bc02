//! Seed data for `dev` runs.
//!
//! A fixtures file is JSON describing the entities the in-memory stores
//! should hold. Component bodies are given inline as text:
//!
//! ```json
//! {
//!   "entities": [
//!     {
//!       "id": "01KA1H53CP2TAW8P8VSZ8J0001",
//!       "parent": "01KA1H53CP2TAW8P8VSZ8J0002",
//!       "components": { "notes.md": "# Notes" }
//!     },
//!     { "id": "01KA1H53CP2TAW8P8VSZ8J0002", "collection_root": "01KA1H53CP2TAW8P8VSZ8J0002" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Deserialize;

use common::entity::{Entity, EntityId};
use common::memory::{MemoryContentStore, MemoryEntityStore, MemoryPermissionService};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevFixtures {
    #[serde(default)]
    pub entities: Vec<FixtureEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureEntity {
    pub id: EntityId,
    #[serde(default = "first_version")]
    pub version: u64,
    #[serde(default)]
    pub parent: Option<EntityId>,
    #[serde(default)]
    pub children: Vec<EntityId>,
    /// Component name to inline body
    #[serde(default)]
    pub components: BTreeMap<String, String>,
    /// Reported by the permission service as this entity's collection root
    #[serde(default)]
    pub collection_root: Option<EntityId>,
    /// Refuse edits to this entity
    #[serde(default)]
    pub read_only: bool,
}

fn first_version() -> u64 {
    1
}

impl DevFixtures {
    pub fn load(path: &Path) -> Result<Self, FixturesError> {
        let raw = std::fs::read(path).map_err(|source| FixturesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&raw)
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self, FixturesError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Fill the in-memory stores. Returns the number of entities inserted.
    pub fn seed(
        self,
        entities: &MemoryEntityStore,
        content: &MemoryContentStore,
        permissions: &MemoryPermissionService,
    ) -> usize {
        let count = self.entities.len();
        for fixture in self.entities {
            let mut entity = Entity::new(fixture.id.clone(), fixture.version);
            entity.parent = fixture.parent;
            entity.children = fixture.children;
            for (name, body) in fixture.components {
                let address = content.insert(Bytes::from(body));
                entity = entity.with_component(name, address);
            }

            if let Some(root) = fixture.collection_root {
                permissions.set_collection(fixture.id.clone(), root);
            }
            if fixture.read_only {
                permissions.deny(fixture.id.clone());
            }
            entities.insert(entity);
        }
        count
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FixturesError {
    #[error("failed to read fixtures {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse fixtures: {0}")]
    Parse(#[from] serde_json::Error),
}
