//! # Batch manifests
//!
//! The manifest is the descriptor the downstream pipeline consumes. It holds
//! one [`DirectoryGroup`] per resolved entity, in resolution order, plus the
//! batch totals.
//!
//! Building a manifest is a pure function of the materialized entities, the
//! requested phases and the batch id. Totals are always summed from the
//! directory groups, never carried over from elsewhere, so the manifest is
//! internally consistent by construction.

use serde::{Deserialize, Serialize};

use crate::materializer::{FileInfo, MaterializedEntity};
use crate::phase::{Phase, PhaseSet};

/// Which downstream phases run for a directory.
///
/// OCR and reorganization never run when reprocessing already-stored
/// entities, so they are not derived from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub ocr: bool,
    pub reorganize: bool,
    pub pinax: bool,
    pub cheimarros: bool,
    pub describe: bool,
}

impl ProcessingConfig {
    pub fn for_phases(phases: &PhaseSet) -> Self {
        Self {
            ocr: false,
            reorganize: false,
            pinax: phases.contains(Phase::Pinax),
            cheimarros: phases.contains(Phase::Cheimarros),
            describe: phases.contains(Phase::Description),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryGroup {
    pub directory_path: String,
    pub processing_config: ProcessingConfig,
    pub file_count: u64,
    pub total_bytes: u64,
    pub files: Vec<FileInfo>,
    /// Entity being reprocessed in place
    pub existing_pi: String,
    pub existing_children_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_parent_path: Option<String>,
}

impl DirectoryGroup {
    fn from_entity(entity: &MaterializedEntity, config: ProcessingConfig) -> Self {
        Self {
            directory_path: entity.id.path(),
            processing_config: config,
            file_count: entity.files.len() as u64,
            total_bytes: entity.files.iter().map(|file| file.size).sum(),
            files: entity.files.clone(),
            existing_pi: entity.id.to_string(),
            existing_children_paths: entity.children.iter().map(|child| child.path()).collect(),
            existing_parent_path: entity.parent.as_ref().map(|parent| parent.path()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchManifest {
    pub batch_id: String,
    pub directories: Vec<DirectoryGroup>,
    pub total_files: u64,
    pub total_bytes: u64,
}

impl BatchManifest {
    pub fn build(entities: &[MaterializedEntity], phases: &PhaseSet, batch_id: &str) -> Self {
        let config = ProcessingConfig::for_phases(phases);
        let directories: Vec<DirectoryGroup> = entities
            .iter()
            .map(|entity| DirectoryGroup::from_entity(entity, config))
            .collect();

        let total_files = directories.iter().map(|dir| dir.file_count).sum();
        let total_bytes = directories.iter().map(|dir| dir.total_bytes).sum();

        Self {
            batch_id: batch_id.to_string(),
            directories,
            total_files,
            total_bytes,
        }
    }

    /// Canonical JSON encoding written to staging.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;

    fn id(n: u32) -> EntityId {
        EntityId::parse(&format!("01KA1H53CP2TAW8P8VSZ8J{:04}", n)).unwrap()
    }

    fn file(owner: &EntityId, name: &str, size: u64) -> FileInfo {
        FileInfo {
            staging_key: format!("staging/b/{owner}/{name}"),
            name: name.to_string(),
            size,
            content_type: "text/plain".to_string(),
        }
    }

    fn sample() -> Vec<MaterializedEntity> {
        vec![
            MaterializedEntity {
                id: id(0),
                version: 2,
                children: vec![],
                parent: Some(id(1)),
                files: vec![file(&id(0), "a.txt", 10), file(&id(0), "b.txt", 5)],
                total_bytes: 15,
            },
            MaterializedEntity {
                id: id(1),
                version: 7,
                children: vec![id(0), id(5)],
                parent: None,
                files: vec![file(&id(1), "pinax.json", 100)],
                total_bytes: 100,
            },
        ]
    }

    #[test]
    fn test_description_only() {
        let phases = PhaseSet::parse(&["description"]).unwrap();
        let manifest = BatchManifest::build(&sample(), &phases, "reprocess_x");

        for dir in &manifest.directories {
            assert_eq!(
                dir.processing_config,
                ProcessingConfig {
                    ocr: false,
                    reorganize: false,
                    pinax: false,
                    cheimarros: false,
                    describe: true,
                }
            );
        }
    }

    #[test]
    fn test_all_phases_never_enable_ocr_or_reorganize() {
        let phases = PhaseSet::parse(&["pinax", "cheimarros", "description"]).unwrap();
        let config = ProcessingConfig::for_phases(&phases);
        assert!(config.pinax && config.cheimarros && config.describe);
        assert!(!config.ocr);
        assert!(!config.reorganize);
    }

    #[test]
    fn test_totals_are_sums_of_directories() {
        let phases = PhaseSet::parse(&["pinax"]).unwrap();
        let manifest = BatchManifest::build(&sample(), &phases, "reprocess_x");

        assert_eq!(manifest.directories.len(), 2);
        assert_eq!(manifest.total_files, 3);
        assert_eq!(manifest.total_bytes, 115);
        assert_eq!(
            manifest.total_files,
            manifest.directories.iter().map(|d| d.file_count).sum::<u64>()
        );
    }

    #[test]
    fn test_totals_ignore_stale_entity_totals() {
        let mut entities = sample();
        entities[0].total_bytes = 9_999;
        let phases = PhaseSet::parse(&["pinax"]).unwrap();
        let manifest = BatchManifest::build(&entities, &phases, "reprocess_x");
        assert_eq!(manifest.directories[0].total_bytes, 15);
        assert_eq!(manifest.total_bytes, 115);
    }

    #[test]
    fn test_linkage_fields() {
        let phases = PhaseSet::parse(&["pinax"]).unwrap();
        let manifest = BatchManifest::build(&sample(), &phases, "reprocess_x");

        let leaf = &manifest.directories[0];
        assert_eq!(leaf.directory_path, id(0).path());
        assert_eq!(leaf.existing_pi, id(0).to_string());
        assert_eq!(leaf.existing_parent_path, Some(id(1).path()));
        assert!(leaf.existing_children_paths.is_empty());

        let top = &manifest.directories[1];
        assert_eq!(top.existing_parent_path, None);
        assert_eq!(
            top.existing_children_paths,
            vec![id(0).path(), id(5).path()]
        );
    }

    #[test]
    fn test_parent_path_omitted_from_json_when_absent() {
        let phases = PhaseSet::parse(&["pinax"]).unwrap();
        let manifest = BatchManifest::build(&sample(), &phases, "reprocess_x");
        let value: serde_json::Value =
            serde_json::from_slice(&manifest.to_json().unwrap()).unwrap();

        assert!(value["directories"][0].get("existing_parent_path").is_some());
        assert!(value["directories"][1].get("existing_parent_path").is_none());
    }

    #[test]
    fn test_build_is_deterministic() {
        let phases = PhaseSet::parse(&["cheimarros", "pinax"]).unwrap();
        let first = BatchManifest::build(&sample(), &phases, "reprocess_x");
        let second = BatchManifest::build(&sample(), &phases, "reprocess_x");
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn test_empty_batch() {
        let phases = PhaseSet::parse(&["pinax"]).unwrap();
        let manifest = BatchManifest::build(&[], &phases, "reprocess_x");
        assert!(manifest.directories.is_empty());
        assert_eq!(manifest.total_files, 0);
        assert_eq!(manifest.total_bytes, 0);
    }
}
