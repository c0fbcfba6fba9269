use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::budget::TurnBudgetPolicy;
use crate::error::InvariantError;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TraceabilityPolicy {
    /// Minimum words in the ChatContext summary.
    pub min_summary_words: usize,
    /// Require transcript hashes to be 64-char lowercase hex (BLAKE3).
    pub require_well_formed_hash: bool,
}

impl Default for TraceabilityPolicy {
    fn default() -> Self {
        Self {
            min_summary_words: 25,
            require_well_formed_hash: true,
        }
    }
}

/// Host-authored parameters for the evolution-turn guards.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardConfig {
    pub budget: TurnBudgetPolicy,
    pub traceability: TraceabilityPolicy,
}

impl GuardConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, InvariantError> {
        let cfg: GuardConfig = serde_json::from_str(raw).map_err(InvariantError::ConfigParse)?;
        Ok(cfg.normalized())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InvariantError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| InvariantError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn normalized(self) -> Self {
        Self {
            budget: self.budget.normalized(),
            traceability: self.traceability,
        }
    }
}
