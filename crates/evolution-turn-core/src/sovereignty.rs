//! Microspace sovereignty profiles.
//!
//! A profile binds a host's microspace to three constraints: evolution is
//! self-only, actuation is host-bounded, and no negative energy is routed to
//! an external host. It also names who may drive evolution and which consent
//! hooks every turn must carry.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::proposal::EvolutionProposal;

/// Role that must always be allowed to control the host's microspace.
pub const SOVEREIGN_ROLE: &str = "augmented-citizen";

/// Roles that must always be denied from mutating the host's microspace.
pub const DENIED_ROLES: [&str; 3] = ["vendor-generic", "sandbox", "pure-machine"];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SovereigntyProfile {
    pub profile_id: String,
    pub host_id: String,
    pub sovereign_owner_did: String,
    pub self_only: bool,
    pub host_bounded: bool,
    pub forbid_external_host_routing: bool,
    pub ai_platforms_may_execute: bool,
    pub irreversible_token_scope_id: String,
    #[serde(default)]
    pub allowed_roles: BTreeSet<String>,
    #[serde(default)]
    pub denied_roles: BTreeSet<String>,
    #[serde(default)]
    pub require_transcripthash: bool,
    #[serde(default)]
    pub require_human_readable_explanation: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SovereigntyStatus {
    RightsSafe,
    ViolatesInvariant(Vec<String>),
}

impl SovereigntyProfile {
    /// Check that the profile itself does not weaken microspace sovereignty.
    pub fn verify_rights_safe(&self) -> SovereigntyStatus {
        let mut errors = Vec::new();

        if self.sovereign_owner_did != self.host_id {
            errors.push("sovereign_owner_did must equal host_id; no external owner".to_string());
        }
        if !self.allowed_roles.contains(SOVEREIGN_ROLE) {
            errors.push(format!(
                "role '{SOVEREIGN_ROLE}' must be allowed to control the microspace"
            ));
        }
        for role in DENIED_ROLES {
            if !self.denied_roles.contains(role) {
                errors.push(format!(
                    "role '{role}' must be explicitly denied from microspace mutation"
                ));
            }
        }
        if !self.self_only {
            errors.push("self_only must be true".to_string());
        }
        if !self.host_bounded {
            errors.push("host_bounded must be true".to_string());
        }
        if !self.forbid_external_host_routing {
            errors.push(
                "forbid_external_host_routing must be true; microspace is sovereign".to_string(),
            );
        }
        if self.ai_platforms_may_execute {
            errors.push("AI platforms may not execute microspace changes, propose-only".to_string());
        }
        if !self.require_transcripthash {
            errors.push("require_transcripthash must be true for every evolution turn".to_string());
        }
        if !self.require_human_readable_explanation {
            errors.push("require_human_readable_explanation must be true".to_string());
        }
        if self.irreversible_token_scope_id.trim().is_empty() {
            errors.push("irreversible_token_scope_id must be non-empty".to_string());
        }

        if errors.is_empty() {
            SovereigntyStatus::RightsSafe
        } else {
            SovereigntyStatus::ViolatesInvariant(errors)
        }
    }

    /// Violations of this profile's constraints by `proposal`.
    pub fn check_proposal(&self, proposal: &EvolutionProposal) -> Vec<String> {
        let mut errors = Vec::new();

        // self-only
        if proposal.host_did != self.host_id {
            errors.push(format!(
                "proposal host '{}' is not profile host '{}'",
                proposal.host_did, self.host_id
            ));
        }
        if proposal.subject_did != proposal.host_did {
            errors.push(format!(
                "proposal subject '{}' differs from host '{}'; evolution is self-only",
                proposal.subject_did, proposal.host_did
            ));
        }

        for p in &proposal.patterns {
            if p.target_host != self.host_id {
                errors.push(format!(
                    "pattern '{}' targets host '{}' outside microspace '{}'",
                    p.target, p.target_host, self.host_id
                ));
            }
            if let Some(sink) = &p.negative_energy_sink {
                if sink != &self.host_id {
                    errors.push(format!(
                        "pattern '{}' routes negative energy to external host '{}'",
                        p.target, sink
                    ));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::{BiophysicalPattern, ChatContext, Reversibility};
    use chrono::Utc;

    const HOST: &str = "did:aln:host-a";

    fn profile() -> SovereigntyProfile {
        SovereigntyProfile {
            profile_id: "microspace-v1".into(),
            host_id: HOST.into(),
            sovereign_owner_did: HOST.into(),
            self_only: true,
            host_bounded: true,
            forbid_external_host_routing: true,
            ai_platforms_may_execute: false,
            irreversible_token_scope_id: "evolution-irreversible-v1".into(),
            allowed_roles: roles(&[SOVEREIGN_ROLE]),
            denied_roles: roles(&DENIED_ROLES),
            require_transcripthash: true,
            require_human_readable_explanation: true,
        }
    }

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|r| r.to_string()).collect()
    }

    fn proposal(patterns: Vec<BiophysicalPattern>) -> EvolutionProposal {
        EvolutionProposal {
            id: "prop-1".into(),
            validator_alias: "validator-1".into(),
            block_id: "block-1".into(),
            host_did: HOST.into(),
            subject_did: HOST.into(),
            submitted_at: Utc::now(),
            chat: ChatContext {
                transcripthash: String::new(),
                summary: String::new(),
            },
            patterns,
            irreversible_token: None,
            sovereignty_profile_id: "microspace-v1".into(),
            eco_cost_nj: 0.0,
            brain_tokens: 0.0,
        }
    }

    fn pattern(target_host: &str, sink: Option<&str>) -> BiophysicalPattern {
        BiophysicalPattern {
            target: "cortex.visual.v1".into(),
            target_host: target_host.into(),
            intensity: 0.25,
            duration_secs: 45,
            reversibility: Reversibility::FullyReversible,
            negative_energy_sink: sink.map(str::to_string),
        }
    }

    #[test]
    fn default_profile_is_rights_safe() {
        assert_eq!(profile().verify_rights_safe(), SovereigntyStatus::RightsSafe);
    }

    #[test]
    fn weakened_profile_lists_every_violation() {
        let weak = SovereigntyProfile {
            sovereign_owner_did: "did:aln:vendor".into(),
            forbid_external_host_routing: false,
            ai_platforms_may_execute: true,
            irreversible_token_scope_id: " ".into(),
            ..profile()
        };
        match weak.verify_rights_safe() {
            SovereigntyStatus::ViolatesInvariant(errors) => assert_eq!(errors.len(), 4),
            SovereigntyStatus::RightsSafe => panic!("weakened profile accepted"),
        }
    }

    #[test]
    fn roles_and_consent_hooks_are_enforced() {
        let loose = SovereigntyProfile {
            allowed_roles: roles(&["vendor-generic"]),
            denied_roles: roles(&["sandbox"]),
            require_transcripthash: false,
            require_human_readable_explanation: false,
            ..profile()
        };
        let SovereigntyStatus::ViolatesInvariant(errors) = loose.verify_rights_safe() else {
            panic!("profile without roles or consent hooks accepted");
        };
        assert_eq!(errors.len(), 5);
        assert!(errors[0].contains("'augmented-citizen' must be allowed"));
        assert!(errors[1].contains("'vendor-generic' must be explicitly denied"));
        assert!(errors[2].contains("'pure-machine' must be explicitly denied"));
        assert!(errors.iter().any(|e| e.starts_with("require_transcripthash")));
        assert!(errors.iter().any(|e| e.starts_with("require_human_readable_explanation")));
    }

    #[test]
    fn profile_json_without_roles_is_not_rights_safe() {
        let raw = r#"{"profile_id": "microspace-v1", "host_id": "did:aln:host-a",
            "sovereign_owner_did": "did:aln:host-a", "self_only": true,
            "host_bounded": true, "forbid_external_host_routing": true,
            "ai_platforms_may_execute": false,
            "irreversible_token_scope_id": "evolution-irreversible-v1"}"#;
        let parsed: SovereigntyProfile = serde_json::from_str(raw).unwrap();
        assert!(parsed.allowed_roles.is_empty());
        assert_ne!(parsed.verify_rights_safe(), SovereigntyStatus::RightsSafe);
    }

    #[test]
    fn local_patterns_and_local_sink_pass() {
        let p = proposal(vec![pattern(HOST, None), pattern(HOST, Some(HOST))]);
        assert!(profile().check_proposal(&p).is_empty());
    }

    #[test]
    fn external_target_and_sink_fail() {
        let p = proposal(vec![pattern("did:aln:host-b", Some("did:aln:grid-7"))]);
        let errors = profile().check_proposal(&p);
        assert_eq!(errors.len(), 2);
        assert!(errors[1].contains("negative energy"));
    }

    #[test]
    fn acting_on_another_subject_is_not_self_only() {
        let mut p = proposal(Vec::new());
        p.subject_did = "did:aln:someone-else".into();
        let errors = profile().check_proposal(&p);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("self-only"));
    }
}
