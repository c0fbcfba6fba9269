//! SMART-EVO-TURN-NEUROPC: the evolution-turn rule for neuromorphic
//! personal-compute hosts.
//!
//! Answers the three per-turn checks from the host-local stores. A check
//! that cannot be evaluated (blank ids, unknown proposal or profile, store
//! failure) is `NotEvaluable` and therefore never passes.

use std::sync::Arc;

use evolution_turn_core::{
    is_well_formed_transcript_hash, CheckKind, EvolutionProposal, EvolutionStore,
    EvolutionTurnInvariant, GuardConfig, SovereigntyStatus, Verdict,
};
use tracing::{debug, warn};

pub const SMART_EVO_TURN_NEUROPC: &str = "SMART-EVO-TURN-NEUROPC";

pub struct SmartEvoTurnNeuropc<S> {
    store: Arc<S>,
    config: GuardConfig,
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

impl<S: EvolutionStore> SmartEvoTurnNeuropc<S> {
    pub fn new(store: Arc<S>, config: GuardConfig) -> Self {
        Self {
            store,
            config: config.normalized(),
        }
    }

    fn load_proposal(&self, proposal_id: &str) -> Result<EvolutionProposal, Verdict> {
        if blank(proposal_id) {
            return Err(Verdict::NotEvaluable("proposal_id is blank".into()));
        }
        match self.store.proposal(proposal_id) {
            Ok(Some(p)) => Ok(p),
            Ok(None) => Err(Verdict::NotEvaluable(format!(
                "unknown proposal '{proposal_id}'"
            ))),
            Err(e) => Err(Verdict::NotEvaluable(e.to_string())),
        }
    }

    fn observe(&self, check: CheckKind, proposal_id: &str, verdict: Verdict) -> Verdict {
        match &verdict {
            Verdict::Passed => {
                debug!(rule_id = SMART_EVO_TURN_NEUROPC, %check, proposal_id, "evolution-turn check passed")
            }
            Verdict::Failed(errors) => {
                warn!(rule_id = SMART_EVO_TURN_NEUROPC, %check, proposal_id, ?errors, "evolution-turn check failed")
            }
            Verdict::NotEvaluable(reason) => {
                warn!(rule_id = SMART_EVO_TURN_NEUROPC, %check, proposal_id, %reason, "evolution-turn check not evaluable")
            }
        }
        verdict
    }

    fn turn_budget(&self, validator_alias: &str, proposal_id: &str, block_id: &str) -> Verdict {
        if blank(validator_alias) {
            return Verdict::NotEvaluable("validator_alias is blank".into());
        }
        if blank(block_id) {
            return Verdict::NotEvaluable("block_id is blank".into());
        }
        let proposal = match self.load_proposal(proposal_id) {
            Ok(p) => p,
            Err(v) => return v,
        };

        let mut errors = Vec::new();
        if proposal.validator_alias != validator_alias {
            errors.push(format!(
                "proposal '{}' belongs to validator '{}', not '{}'",
                proposal.id, proposal.validator_alias, validator_alias
            ));
        }
        if proposal.block_id != block_id {
            errors.push(format!(
                "proposal '{}' is in block '{}', not '{}'",
                proposal.id, proposal.block_id, block_id
            ));
        }
        if !errors.is_empty() {
            return Verdict::Failed(errors);
        }

        let ledger = match self.store.turns_for_validator(validator_alias) {
            Ok(l) => l,
            Err(e) => return Verdict::NotEvaluable(e.to_string()),
        };
        Verdict::from_errors(self.config.budget.check(&proposal, &ledger))
    }

    fn traceability_and_consent(
        &self,
        proposal_id: &str,
        transcripthash: &str,
        irreversible_required: bool,
    ) -> Verdict {
        let proposal = match self.load_proposal(proposal_id) {
            Ok(p) => p,
            Err(v) => return v,
        };
        let policy = &self.config.traceability;
        let mut errors = Vec::new();

        if blank(transcripthash) {
            errors.push("transcripthash must be non-empty for all evolution turns".to_string());
        } else {
            if policy.require_well_formed_hash && !is_well_formed_transcript_hash(transcripthash) {
                errors.push(format!(
                    "transcripthash '{transcripthash}' is not a 64-char lowercase hex digest"
                ));
            }
            if proposal.chat.transcripthash != transcripthash {
                errors.push("transcripthash does not match the proposal's ChatContext".to_string());
            }
        }

        let words = proposal.chat.summary_word_count();
        if words == 0 {
            errors.push("missing ChatContext summary for this turn".to_string());
        } else if words < policy.min_summary_words {
            errors.push(format!(
                "ChatContext summary too short: {} words (min {})",
                words, policy.min_summary_words
            ));
        }

        if irreversible_required || proposal.requires_irreversible_token() {
            match &proposal.irreversible_token {
                None => errors.push(
                    "irreversible token linkage required but no IrreversibleToken attached"
                        .to_string(),
                ),
                Some(token) => {
                    if token.revoked {
                        errors.push(format!("IrreversibleToken '{}' is revoked", token.token_id));
                    }
                    if token.proposal_id != proposal.id {
                        errors.push(format!(
                            "IrreversibleToken is linked to proposal '{}'",
                            token.proposal_id
                        ));
                    }
                    if token.host_did != proposal.host_did {
                        errors.push("IrreversibleToken was issued by another host".to_string());
                    }
                    if token.transcripthash != transcripthash {
                        errors.push(
                            "IrreversibleToken.transcripthash != turn transcripthash".to_string(),
                        );
                    }
                    if blank(&token.scope_id) {
                        errors.push("IrreversibleToken.scope_id is blank".to_string());
                    } else {
                        match self.store.profile(&proposal.sovereignty_profile_id) {
                            Ok(Some(profile))
                                if profile.irreversible_token_scope_id != token.scope_id =>
                            {
                                errors.push(format!(
                                    "IrreversibleToken scope '{}' is not profile scope '{}'",
                                    token.scope_id, profile.irreversible_token_scope_id
                                ));
                            }
                            Ok(_) => {}
                            Err(e) => return Verdict::NotEvaluable(e.to_string()),
                        }
                    }
                }
            }
        }

        Verdict::from_errors(errors)
    }

    fn microspace_sovereignty(&self, proposal_id: &str, sovereignty_profile_id: &str) -> Verdict {
        if blank(sovereignty_profile_id) {
            return Verdict::NotEvaluable("sovereignty_profile_id is blank".into());
        }
        let proposal = match self.load_proposal(proposal_id) {
            Ok(p) => p,
            Err(v) => return v,
        };
        let profile = match self.store.profile(sovereignty_profile_id) {
            Ok(Some(p)) => p,
            Ok(None) => {
                return Verdict::NotEvaluable(format!(
                    "unknown sovereignty profile '{sovereignty_profile_id}'"
                ))
            }
            Err(e) => return Verdict::NotEvaluable(e.to_string()),
        };

        let mut errors = Vec::new();
        if proposal.sovereignty_profile_id != sovereignty_profile_id {
            errors.push(format!(
                "proposal declares sovereignty profile '{}', not '{}'",
                proposal.sovereignty_profile_id, sovereignty_profile_id
            ));
        }
        if let SovereigntyStatus::ViolatesInvariant(violations) = profile.verify_rights_safe() {
            errors.extend(violations);
        }
        errors.extend(profile.check_proposal(&proposal));

        Verdict::from_errors(errors)
    }
}

impl<S: EvolutionStore> EvolutionTurnInvariant for SmartEvoTurnNeuropc<S> {
    fn id(&self) -> &str {
        SMART_EVO_TURN_NEUROPC
    }

    fn evaluate_turn_budget(&self, validator_alias: &str, proposal_id: &str, block_id: &str) -> Verdict {
        let verdict = self.turn_budget(validator_alias, proposal_id, block_id);
        self.observe(CheckKind::TurnBudget, proposal_id, verdict)
    }

    fn evaluate_traceability_and_consent(
        &self,
        proposal_id: &str,
        transcripthash: &str,
        irreversible_required: bool,
    ) -> Verdict {
        let verdict = self.traceability_and_consent(proposal_id, transcripthash, irreversible_required);
        self.observe(CheckKind::TraceabilityAndConsent, proposal_id, verdict)
    }

    fn evaluate_microspace_sovereignty(&self, proposal_id: &str, sovereignty_profile_id: &str) -> Verdict {
        let verdict = self.microspace_sovereignty(proposal_id, sovereignty_profile_id);
        self.observe(CheckKind::MicrospaceSovereignty, proposal_id, verdict)
    }
}
