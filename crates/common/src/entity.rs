//! # Entities
//!
//! Read-only view of the hierarchical content entities held by the external
//! content store. Entities are addressed by a 26-character Crockford base32
//! identifier and carry a named set of components, each pointing at content
//! by address.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

static ENTITY_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-HJKMNP-TV-Z]{26}$").expect("static pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid entity id '{0}': expected 26 Crockford base32 characters")]
pub struct InvalidEntityId(pub String);

/// Identifier of a stored entity.
///
/// Always holds a validated 26-character Crockford base32 string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Identifier of the absolute root of the entity hierarchy.
    pub const ROOT: &'static str = "00000000000000000000000000";

    pub fn parse(value: &str) -> Result<Self, InvalidEntityId> {
        if ENTITY_ID_PATTERN.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidEntityId(value.to_string()))
        }
    }

    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Logical directory path used for this entity inside a batch.
    pub fn path(&self) -> String {
        format!("/{}", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = InvalidEntityId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        EntityId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Opaque address of content inside the content-addressed store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(String);

impl ContentAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entity at its current version, as returned by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub version: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: time::OffsetDateTime,
    /// Component name to content address. Names are unique by construction.
    #[serde(default)]
    pub components: BTreeMap<String, ContentAddress>,
    #[serde(default)]
    pub children: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Entity {
    pub fn new(id: EntityId, version: u64) -> Self {
        Self {
            id,
            version,
            timestamp: time::OffsetDateTime::UNIX_EPOCH,
            components: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
            note: None,
        }
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_child(mut self, child: EntityId) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_component(mut self, name: impl Into<String>, address: ContentAddress) -> Self {
        self.components.insert(name.into(), address);
        self
    }
}
