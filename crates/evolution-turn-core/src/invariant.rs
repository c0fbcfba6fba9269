use serde::{Deserialize, Serialize};
use std::fmt;

/// The three per-turn checks every evolution-turn rule answers.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckKind {
    TurnBudget,
    TraceabilityAndConsent,
    MicrospaceSovereignty,
}

impl CheckKind {
    pub const ALL: [CheckKind; 3] = [
        CheckKind::TurnBudget,
        CheckKind::TraceabilityAndConsent,
        CheckKind::MicrospaceSovereignty,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::TurnBudget => "turn_budget",
            CheckKind::TraceabilityAndConsent => "traceability_and_consent",
            CheckKind::MicrospaceSovereignty => "microspace_sovereignty",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one check. Only `Passed` counts as a pass; a check that could
/// not be evaluated (unknown proposal, blank identifier, store failure) is
/// reported separately from a check that ran and failed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed(Vec<String>),
    NotEvaluable(String),
}

impl Verdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }

    /// `Passed` when `errors` is empty, otherwise `Failed(errors)`.
    pub fn from_errors(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Verdict::Passed
        } else {
            Verdict::Failed(errors)
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Passed => "passed",
            Verdict::Failed(_) => "failed",
            Verdict::NotEvaluable(_) => "not_evaluable",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckOutcome {
    pub rule_id: String,
    pub check: CheckKind,
    pub verdict: Verdict,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.verdict.is_passed()
    }
}

/// Per-turn invariants applied to an AI-chat-driven evolution proposal.
///
/// Implementations are registered by `id()` in an `InvariantRegistry` and may
/// be called concurrently. None of the methods may panic, whatever the
/// arguments: blank or unknown identifiers are answered, not rejected.
pub trait EvolutionTurnInvariant: Send + Sync {
    /// Stable, non-empty rule identifier, e.g. `"SMART-EVO-TURN-NEUROPC"`.
    fn id(&self) -> &str;

    /// Does the proposal/block pair stay within the validator's per-turn
    /// evolution budget?
    fn evaluate_turn_budget(&self, validator_alias: &str, proposal_id: &str, block_id: &str)
        -> Verdict;

    /// Does the turn carry a transcript hash and ChatContext summary, plus
    /// irreversible token linkage when required?
    fn evaluate_traceability_and_consent(
        &self,
        proposal_id: &str,
        transcripthash: &str,
        irreversible_required: bool,
    ) -> Verdict;

    /// Were the microspace constraints (self-only, host-bounded, no external
    /// negative-energy routing) applied?
    fn evaluate_microspace_sovereignty(&self, proposal_id: &str, sovereignty_profile_id: &str)
        -> Verdict;

    fn verify_turn_budget(&self, validator_alias: &str, proposal_id: &str, block_id: &str) -> bool {
        self.evaluate_turn_budget(validator_alias, proposal_id, block_id)
            .is_passed()
    }

    fn verify_traceability_and_consent(
        &self,
        proposal_id: &str,
        transcripthash: &str,
        irreversible_required: bool,
    ) -> bool {
        self.evaluate_traceability_and_consent(proposal_id, transcripthash, irreversible_required)
            .is_passed()
    }

    fn verify_microspace_sovereignty(&self, proposal_id: &str, sovereignty_profile_id: &str) -> bool {
        self.evaluate_microspace_sovereignty(proposal_id, sovereignty_profile_id)
            .is_passed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_passed_is_true() {
        assert!(Verdict::Passed.is_passed());
        assert!(!Verdict::Failed(vec!["x".into()]).is_passed());
        assert!(!Verdict::NotEvaluable("unknown proposal".into()).is_passed());
        assert_eq!(Verdict::from_errors(Vec::new()), Verdict::Passed);
    }

    #[test]
    fn verdict_serializes_with_status_tag() {
        let json = serde_json::to_value(Verdict::Failed(vec!["over budget".into()])).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["detail"][0], "over budget");
        assert_eq!(
            serde_json::to_value(Verdict::Passed).unwrap()["status"],
            "passed"
        );
    }
}
