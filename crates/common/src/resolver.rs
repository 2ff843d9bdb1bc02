//! # Entity chain resolution
//!
//! Turns a target identifier into the ordered list of entities a batch must
//! cover. Without cascade that is just the target. With cascade the walk
//! follows parent links upward, one fetch per hop, until it reaches an entity
//! without a parent, the absolute root, or the stop boundary.
//!
//! The result is leaf-first: the target, then each ancestor in strictly
//! increasing distance from it. The stop boundary itself is never included.

use std::collections::HashSet;

use crate::entity::EntityId;
use crate::error::PipelineError;
use crate::retry::RetryPolicy;
use crate::store::EntityStore;

/// Default ceiling on the number of ancestors a cascade may include.
pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 100;

pub struct EntityResolver<'a> {
    store: &'a dyn EntityStore,
    retry: RetryPolicy,
    max_depth: usize,
}

impl<'a> EntityResolver<'a> {
    pub fn new(store: &'a dyn EntityStore, retry: RetryPolicy, max_depth: usize) -> Self {
        Self {
            store,
            retry,
            max_depth,
        }
    }

    pub async fn resolve_chain(
        &self,
        target: &EntityId,
        cascade: bool,
        stop: &EntityId,
    ) -> Result<Vec<EntityId>, PipelineError> {
        if !cascade {
            return Ok(vec![target.clone()]);
        }

        let mut chain = vec![target.clone()];
        let mut visited = HashSet::from([target.clone()]);
        let mut current = target.clone();

        loop {
            let entity = self
                .retry
                .run("fetch entity", || self.store.get_entity(&current))
                .await
                .map_err(|e| PipelineError::from_store(&format!("entity {current}"), e))?;

            let parent = match entity.parent {
                Some(parent) if !parent.is_root() && parent != *stop => parent,
                _ => break,
            };

            if !visited.insert(parent.clone()) {
                return Err(PipelineError::CycleDetected {
                    target: target.clone(),
                    id: parent,
                });
            }
            if chain.len() > self.max_depth {
                return Err(PipelineError::DepthExceeded {
                    target: target.clone(),
                    max_depth: self.max_depth,
                });
            }

            chain.push(parent.clone());
            current = parent;
        }

        Ok(chain)
    }
}
