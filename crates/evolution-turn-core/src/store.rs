//! Read access to the data evolution-turn invariants are evaluated over.
//!
//! Proposals, the per-validator turn ledger, and sovereignty profiles are
//! owned elsewhere; rules see them only through these traits.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::budget::TurnRecord;
use crate::error::InvariantError;
use crate::proposal::EvolutionProposal;
use crate::sovereignty::SovereigntyProfile;

pub trait ProposalStore {
    fn proposal(&self, proposal_id: &str) -> Result<Option<EvolutionProposal>, InvariantError>;
}

pub trait TurnLedger {
    fn turns_for_validator(&self, validator_alias: &str) -> Result<Vec<TurnRecord>, InvariantError>;
}

pub trait SovereigntyRegistry {
    fn profile(&self, profile_id: &str) -> Result<Option<SovereigntyProfile>, InvariantError>;
}

/// Everything a rule needs, in one bound.
pub trait EvolutionStore: ProposalStore + TurnLedger + SovereigntyRegistry + Send + Sync {}

impl<T> EvolutionStore for T where T: ProposalStore + TurnLedger + SovereigntyRegistry + Send + Sync {}

/// Serialized form of a store, as exchanged between host tools.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EvolutionSnapshot {
    #[serde(default)]
    pub proposals: Vec<EvolutionProposal>,
    #[serde(default)]
    pub turns: Vec<TurnRecord>,
    #[serde(default)]
    pub profiles: Vec<SovereigntyProfile>,
}

impl EvolutionSnapshot {
    pub fn from_json_str(raw: &str) -> Result<Self, InvariantError> {
        serde_json::from_str(raw).map_err(InvariantError::SnapshotParse)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEvolutionStore {
    proposals: RwLock<HashMap<String, EvolutionProposal>>,
    turns: RwLock<BTreeMap<String, Vec<TurnRecord>>>,
    profiles: RwLock<HashMap<String, SovereigntyProfile>>,
}

impl InMemoryEvolutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: EvolutionSnapshot) -> Result<Self, InvariantError> {
        let store = Self::new();
        for p in snapshot.proposals {
            store.insert_proposal(p)?;
        }
        for t in snapshot.turns {
            store.record_turn(t)?;
        }
        for p in snapshot.profiles {
            store.insert_profile(p)?;
        }
        Ok(store)
    }

    /// Insert or replace a proposal by id.
    pub fn insert_proposal(&self, proposal: EvolutionProposal) -> Result<(), InvariantError> {
        let mut map = self
            .proposals
            .write()
            .map_err(|_| InvariantError::StorePoisoned("proposals"))?;
        map.insert(proposal.id.clone(), proposal);
        Ok(())
    }

    pub fn record_turn(&self, turn: TurnRecord) -> Result<(), InvariantError> {
        let mut map = self
            .turns
            .write()
            .map_err(|_| InvariantError::StorePoisoned("turns"))?;
        let ledger = map.entry(turn.validator_alias.clone()).or_default();
        ledger.push(turn);
        ledger.sort_by_key(|t| t.at);
        Ok(())
    }

    pub fn insert_profile(&self, profile: SovereigntyProfile) -> Result<(), InvariantError> {
        let mut map = self
            .profiles
            .write()
            .map_err(|_| InvariantError::StorePoisoned("profiles"))?;
        map.insert(profile.profile_id.clone(), profile);
        Ok(())
    }

    pub fn snapshot(&self) -> Result<EvolutionSnapshot, InvariantError> {
        let proposals = self
            .proposals
            .read()
            .map_err(|_| InvariantError::StorePoisoned("proposals"))?;
        let turns = self
            .turns
            .read()
            .map_err(|_| InvariantError::StorePoisoned("turns"))?;
        let profiles = self
            .profiles
            .read()
            .map_err(|_| InvariantError::StorePoisoned("profiles"))?;

        let mut snapshot = EvolutionSnapshot {
            proposals: proposals.values().cloned().collect(),
            turns: turns.values().flatten().cloned().collect(),
            profiles: profiles.values().cloned().collect(),
        };
        snapshot.proposals.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot.profiles.sort_by(|a, b| a.profile_id.cmp(&b.profile_id));
        Ok(snapshot)
    }
}

impl ProposalStore for InMemoryEvolutionStore {
    fn proposal(&self, proposal_id: &str) -> Result<Option<EvolutionProposal>, InvariantError> {
        let map = self
            .proposals
            .read()
            .map_err(|_| InvariantError::StorePoisoned("proposals"))?;
        Ok(map.get(proposal_id).cloned())
    }
}

impl TurnLedger for InMemoryEvolutionStore {
    fn turns_for_validator(&self, validator_alias: &str) -> Result<Vec<TurnRecord>, InvariantError> {
        let map = self
            .turns
            .read()
            .map_err(|_| InvariantError::StorePoisoned("turns"))?;
        Ok(map.get(validator_alias).cloned().unwrap_or_default())
    }
}

impl SovereigntyRegistry for InMemoryEvolutionStore {
    fn profile(&self, profile_id: &str) -> Result<Option<SovereigntyProfile>, InvariantError> {
        let map = self
            .profiles
            .read()
            .map_err(|_| InvariantError::StorePoisoned("profiles"))?;
        Ok(map.get(profile_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn turn(validator: &str, proposal: &str, minute: u32) -> TurnRecord {
        TurnRecord {
            validator_alias: validator.into(),
            proposal_id: proposal.into(),
            block_id: "block-1".into(),
            at: Utc.with_ymd_and_hms(2026, 3, 14, 9, minute, 0).unwrap(),
        }
    }

    #[test]
    fn ledger_is_per_validator_and_time_ordered() {
        let store = InMemoryEvolutionStore::new();
        store.record_turn(turn("validator-1", "p2", 30)).unwrap();
        store.record_turn(turn("validator-2", "q1", 10)).unwrap();
        store.record_turn(turn("validator-1", "p1", 5)).unwrap();

        let ledger = store.turns_for_validator("validator-1").unwrap();
        let ids: Vec<_> = ledger.iter().map(|t| t.proposal_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert!(store.turns_for_validator("").unwrap().is_empty());
    }

    #[test]
    fn unknown_ids_resolve_to_none() {
        let store = InMemoryEvolutionStore::new();
        assert!(store.proposal("prop-1").unwrap().is_none());
        assert!(store.profile("").unwrap().is_none());
    }

    #[test]
    fn snapshot_json_loads_into_store() {
        let raw = r#"{
            "turns": [
                {"validator_alias": "validator-1", "proposal_id": "p1",
                 "block_id": "block-1", "at": "2026-03-14T09:05:00Z"}
            ],
            "profiles": [
                {"profile_id": "microspace-v1", "host_id": "did:aln:host-a",
                 "sovereign_owner_did": "did:aln:host-a", "self_only": true,
                 "host_bounded": true, "forbid_external_host_routing": true,
                 "ai_platforms_may_execute": false,
                 "irreversible_token_scope_id": "evolution-irreversible-v1"}
            ]
        }"#;
        let store =
            InMemoryEvolutionStore::from_snapshot(EvolutionSnapshot::from_json_str(raw).unwrap())
                .unwrap();

        assert_eq!(store.turns_for_validator("validator-1").unwrap().len(), 1);
        assert!(store.profile("microspace-v1").unwrap().is_some());

        let back = store.snapshot().unwrap();
        assert!(back.proposals.is_empty());
        assert_eq!(back.turns.len(), 1);
        assert_eq!(back.profiles.len(), 1);
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        let err = EvolutionSnapshot::from_json_str("{\"turns\": 3}").unwrap_err();
        assert!(matches!(err, InvariantError::SnapshotParse(_)));
    }

    #[test]
    fn poisoned_lock_surfaces_as_store_error() {
        let store = Arc::new(InMemoryEvolutionStore::new());
        let writer = Arc::clone(&store);
        let crashed = std::thread::spawn(move || {
            let _guard = writer.proposals.write().unwrap();
            panic!("writer crashed while holding the proposals lock");
        })
        .join();
        assert!(crashed.is_err());

        assert!(matches!(
            store.proposal("prop-1"),
            Err(InvariantError::StorePoisoned("proposals"))
        ));
        assert!(matches!(store.snapshot(), Err(InvariantError::StorePoisoned("proposals"))));
        assert_eq!(
            store.proposal("prop-1").unwrap_err().to_string(),
            "store lock poisoned: proposals"
        );

        // Other maps keep working.
        store.record_turn(turn("validator-1", "p1", 5)).unwrap();
        assert_eq!(store.turns_for_validator("validator-1").unwrap().len(), 1);
    }
}
