use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A downstream processing step that can be requested for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pinax,
    Cheimarros,
    Description,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Pinax, Phase::Cheimarros, Phase::Description];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pinax => "pinax",
            Phase::Cheimarros => "cheimarros",
            Phase::Description => "description",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    #[error("unknown phase '{0}', expected one of: pinax, cheimarros, description")]
    Unknown(String),
    #[error("at least one phase must be requested")]
    Empty,
}

impl FromStr for Phase {
    type Err = PhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| PhaseError::Unknown(s.to_string()))
    }
}

/// Non-empty, de-duplicated set of requested phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhaseSet(Vec<Phase>);

impl PhaseSet {
    pub fn new(phases: impl IntoIterator<Item = Phase>) -> Result<Self, PhaseError> {
        let mut phases: Vec<Phase> = phases.into_iter().collect();
        phases.sort();
        phases.dedup();
        if phases.is_empty() {
            return Err(PhaseError::Empty);
        }
        Ok(Self(phases))
    }

    /// Parse raw phase names as received from a client.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, PhaseError> {
        let phases = names
            .iter()
            .map(|name| name.as_ref().parse::<Phase>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(phases)
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.0.contains(&phase)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Phase> {
        self.0.iter()
    }
}
